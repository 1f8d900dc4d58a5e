//! Mapping handlers: list, add, get, remove and reset.

use crate::admin_api::types::{
    error_response, json_response, ok_empty, ListMappingsResponse, ListMeta,
};
use crate::metrics;
use crate::mock::{MappingConfig, MockEngine};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::{info, warn};

/// GET /mappings - All mappings in match order
pub fn handle_list(engine: &MockEngine) -> Response<Full<Bytes>> {
    let mappings: Vec<MappingConfig> = engine
        .mappings()
        .iter()
        .map(|m| m.config().clone())
        .collect();
    metrics::record_admin_op("list_mappings", "ok");
    json_response(
        StatusCode::OK,
        &ListMappingsResponse {
            meta: ListMeta {
                total: mappings.len(),
            },
            mappings,
        },
    )
}

/// POST /mappings - Register a mapping
pub fn handle_add(engine: &MockEngine, body: &[u8]) -> Response<Full<Bytes>> {
    let config: MappingConfig = match serde_json::from_slice(body) {
        Ok(c) => c,
        Err(e) => {
            warn!("Rejected mapping: {}", e);
            metrics::record_admin_op("add_mapping", "bad_request");
            return error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {e}"));
        }
    };

    match engine.add_mapping(config) {
        Ok(mapping) => {
            metrics::record_admin_op("add_mapping", "ok");
            json_response(StatusCode::CREATED, mapping.config())
        }
        Err(e) => {
            warn!("Rejected mapping: {}", e);
            metrics::record_admin_op("add_mapping", "bad_request");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

/// GET /mappings/:id
pub fn handle_get(engine: &MockEngine, id: &str) -> Response<Full<Bytes>> {
    match engine.get_mapping(id) {
        Some(mapping) => {
            metrics::record_admin_op("get_mapping", "ok");
            json_response(StatusCode::OK, mapping.config())
        }
        None => {
            metrics::record_admin_op("get_mapping", "not_found");
            mapping_not_found(id)
        }
    }
}

/// DELETE /mappings/:id
pub fn handle_delete(engine: &MockEngine, id: &str) -> Response<Full<Bytes>> {
    match engine.remove_mapping(id) {
        Some(mapping) => {
            info!("Removed mapping {}", id);
            metrics::record_admin_op("delete_mapping", "ok");
            json_response(StatusCode::OK, mapping.config())
        }
        None => {
            metrics::record_admin_op("delete_mapping", "not_found");
            mapping_not_found(id)
        }
    }
}

/// DELETE /mappings - Remove all mappings, keeping scenario state
pub fn handle_delete_all(engine: &MockEngine) -> Response<Full<Bytes>> {
    engine.reset_mappings();
    info!("Removed all mappings");
    metrics::record_admin_op("delete_mappings", "ok");
    ok_empty()
}

/// POST /reset - Remove all mappings and all scenario state
pub fn handle_reset(engine: &MockEngine) -> Response<Full<Bytes>> {
    engine.reset();
    info!("Reset mappings and scenarios");
    metrics::record_admin_op("reset", "ok");
    ok_empty()
}

fn mapping_not_found(id: &str) -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, &format!("Mapping '{id}' not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    async fn json_body(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn mapping_body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[tokio::test]
    async fn test_add_assigns_id_and_lists() {
        let engine = MockEngine::new();
        let response = handle_add(
            &engine,
            &mapping_body(json!({
                "request": {"method": "GET", "url": "/a"},
                "response": {"body": "a"}
            })),
        );
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let listed = json_body(handle_list(&engine)).await;
        assert_eq!(listed["meta"]["total"], 1);
        assert_eq!(listed["mappings"][0]["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_add_keeps_scenario_fields() {
        let engine = MockEngine::new();
        let response = handle_add(
            &engine,
            &mapping_body(json!({
                "id": "step1",
                "scenarioName": "flow",
                "requiredScenarioState": "Started",
                "newScenarioState": "TWO",
                "request": {"urlPath": "/flow"}
            })),
        );
        let created = json_body(response).await;
        assert_eq!(created["scenarioName"], "flow");
        assert_eq!(created["newScenarioState"], "TWO");
    }

    #[test]
    fn test_add_rejects_invalid() {
        let engine = MockEngine::new();
        assert_eq!(
            handle_add(&engine, b"{not json").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            handle_add(
                &engine,
                &mapping_body(json!({"request": {"urlPattern": "(unclosed"}}))
            )
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            handle_add(
                &engine,
                &mapping_body(json!({"newScenarioState": "X", "request": {}}))
            )
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert!(engine.mappings().is_empty());
    }

    #[test]
    fn test_get_and_delete() {
        let engine = MockEngine::new();
        handle_add(&engine, &mapping_body(json!({"id": "m1", "request": {}})));

        assert_eq!(handle_get(&engine, "m1").status(), StatusCode::OK);
        assert_eq!(handle_get(&engine, "m2").status(), StatusCode::NOT_FOUND);
        assert_eq!(handle_delete(&engine, "m1").status(), StatusCode::OK);
        assert_eq!(handle_delete(&engine, "m1").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_delete_all_keeps_scenarios_and_reset_clears_them() {
        let engine = MockEngine::new();
        handle_add(&engine, &mapping_body(json!({"request": {}})));
        engine.store().set("flow", "$ID", "TWO");

        handle_delete_all(&engine);
        assert!(engine.mappings().is_empty());
        assert_eq!(engine.store().get("flow", "$ID").as_deref(), Some("TWO"));

        handle_add(&engine, &mapping_body(json!({"request": {}})));
        handle_reset(&engine);
        assert!(engine.mappings().is_empty());
        assert!(engine.store().snapshot().is_empty());
    }
}
