//! Request/response types and response helpers for the Admin API.

use crate::mock::MappingConfig;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

// =============================================================================
// Scenario payloads
// =============================================================================

/// Expected shape of `PUT /scenarios`.
pub const BULK_SET_USAGE: &str = "Expected format is:\n{\n  \"<scenario name>\": {\n    \"<instance id>\": \"<state>\"}\n}";

/// Expected shape of `DELETE /scenarios`.
pub const BULK_DELETE_USAGE: &str = "Expected format is:\n{\n  \"scenarios\": [\n    {\n      \"name\": \"<scenario name>\",\n      \"instances\": [\"<instance id>...\"]}\n  ]\n}";

/// `PUT /scenarios` body: scenario → instance → state
pub type BulkSetRequest = BTreeMap<String, BTreeMap<String, String>>;

/// `DELETE /scenarios` body
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub scenarios: Vec<BulkDeleteEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteEntry {
    pub name: String,
    /// Absent or null deletes the whole scenario.
    #[serde(default)]
    pub instances: Option<Vec<String>>,
}

/// Per-scenario result of a bulk delete.
///
/// A scenario deleted as a whole reports one flag; a scenario deleted
/// instance by instance reports a flag per instance.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DeletionOutcome {
    Scenario(bool),
    Instances(BTreeMap<String, bool>),
}

/// `GET /scenarios/{scenario}/{instance}` body
#[derive(Debug, Serialize)]
pub struct InstanceStateResponse {
    pub scenario: String,
    pub instance: String,
    pub state: String,
}

// =============================================================================
// Mapping payloads
// =============================================================================

/// `GET /mappings` body
#[derive(Debug, Serialize)]
pub struct ListMappingsResponse {
    pub mappings: Vec<MappingConfig>,
    pub meta: ListMeta,
}

#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub total: usize,
}

// =============================================================================
// Response helper functions
// =============================================================================

/// Create a JSON response.
///
/// A body that fails to serialize becomes a 500 carrying the serializer error.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_string_pretty(body) {
        Ok(json) => {
            build_response_with_headers(status, [("Content-Type", "application/json")], json)
        }
        Err(e) => build_response_with_headers(
            StatusCode::INTERNAL_SERVER_ERROR,
            [("Content-Type", "text/plain")],
            format!("Failed to serialize response body: {e}"),
        ),
    }
}

/// Build an HTTP response with the given status and body.
///
/// This function handles the unlikely case where Response::builder() fails
/// by returning a minimal 500 error response.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| internal_error())
}

/// Build an HTTP response with headers.
///
/// Invalid header names or values fall back to a minimal 500 response.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| internal_error())
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

/// Create a not found response
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Create an empty 200 response
pub fn ok_empty() -> Response<Full<Bytes>> {
    build_response(StatusCode::OK, Bytes::new())
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde_json::json;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn test_error_response_format() {
        let resp = error_response(StatusCode::BAD_REQUEST, "Test error");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_json_response() {
        let body = json!({"test": "value"});
        let resp = json_response(StatusCode::OK, &body);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_json_response_serialization_failure_is_500() {
        let resp = json_response(StatusCode::OK, &Unserializable);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_header_falls_back_to_500() {
        let resp = build_response_with_headers(StatusCode::OK, [("bad header", "x")], "body");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_response() {
        let resp = not_found();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_deletion_outcome_shapes() {
        let mut result = BTreeMap::new();
        result.insert("A".to_string(), DeletionOutcome::Scenario(true));
        result.insert(
            "B".to_string(),
            DeletionOutcome::Instances(BTreeMap::from([
                ("x".to_string(), true),
                ("y".to_string(), false),
            ])),
        );
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"A": true, "B": {"x": true, "y": false}})
        );
    }

    #[test]
    fn test_bulk_delete_instances_optional() {
        let req: BulkDeleteRequest = serde_json::from_value(json!({
            "scenarios": [{"name": "A"}, {"name": "B", "instances": null}, {"name": "C", "instances": ["1"]}]
        }))
        .unwrap();
        assert!(req.scenarios[0].instances.is_none());
        assert!(req.scenarios[1].instances.is_none());
        assert_eq!(req.scenarios[2].instances.as_deref(), Some(&["1".to_string()][..]));
    }
}
