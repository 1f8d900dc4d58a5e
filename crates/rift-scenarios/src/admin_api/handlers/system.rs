//! System handlers: health and metrics.

use crate::admin_api::types::{build_response_with_headers, json_response};
use crate::metrics;
use crate::mock::MockEngine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// GET /health - Health check
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}

/// GET /metrics - Prometheus metrics
pub fn handle_metrics(engine: &MockEngine) -> Response<Full<Bytes>> {
    metrics::update_scenario_gauges(engine.store());
    build_response_with_headers(
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        metrics::collect_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_health() {
        assert_eq!(handle_health().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_exposes_scenario_gauges() {
        let engine = MockEngine::new();
        engine.store().set("flow", "a", "Started");

        let response = handle_metrics(&engine);
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("rift_scenarios_tracked"));
    }
}
