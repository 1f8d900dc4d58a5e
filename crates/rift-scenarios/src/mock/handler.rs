//! Request handling for the mock listener.

use super::engine::MockEngine;
use crate::admin_api::types::{build_response_with_headers, error_response};
use crate::metrics;
use crate::request::MockRequest;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

/// Body returned when no mapping fires.
pub const NOT_MATCHED_BODY: &str = "Request was not matched";

/// Handle a request to the mock listener
pub async fn handle_mock_request(
    req: Request<Incoming>,
    engine: Arc<MockEngine>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            ));
        }
    };

    let request = MockRequest::from_parts(&parts.method, &parts.uri, &parts.headers, body);
    Ok(respond(&engine, &request).await)
}

/// Find the mapping for a buffered request and render its response.
pub async fn respond(engine: &MockEngine, request: &MockRequest) -> Response<Full<Bytes>> {
    let Some(mapping) = engine.find_match(request) else {
        debug!("No mapping matched {} {}", request.method(), request.url());
        metrics::record_mock_request(request.method(), false);
        return build_response_with_headers(
            StatusCode::NOT_FOUND,
            [("Content-Type", "text/plain")],
            NOT_MATCHED_BODY,
        );
    };

    debug!(
        "Mapping {} matched {} {}",
        mapping.id(),
        request.method(),
        request.url()
    );
    metrics::record_mock_request(request.method(), true);

    let response = mapping.response();
    if let Some(delay) = response.delay() {
        tokio::time::sleep(delay).await;
    }
    response.to_response()
}
