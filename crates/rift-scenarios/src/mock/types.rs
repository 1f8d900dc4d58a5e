//! Mapping configuration, compiled mappings and response definitions.

use crate::admin_api::types::build_response_with_headers;
use crate::predicate::{CompiledRequestSpec, PatternError, RequestSpec};
use crate::request::MockRequest;
use crate::scenario::{
    ScenarioError, ScenarioGate, ScenarioGateConfig, ScenarioStore, StateGatedMatcher,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Priority given to mappings that do not set one. Lower wins.
pub const DEFAULT_PRIORITY: u32 = 5;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("invalid request pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error("invalid scenario configuration: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("invalid response: {0}")]
    Response(String),
}

/// A mock rule as written in configuration or posted to the admin API.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    /// Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default)]
    pub request: RequestSpec,
    #[serde(default)]
    pub response: ResponseDefinition,
    #[serde(flatten)]
    pub scenario: ScenarioGateConfig,
}

/// Canned response of a mapping.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDefinition {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_delay_milliseconds: Option<u64>,
}

fn default_status() -> u16 {
    200
}

impl Default for ResponseDefinition {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: BTreeMap::new(),
            body: None,
            json_body: None,
            base64_body: None,
            fixed_delay_milliseconds: None,
        }
    }
}

/// Response ready to be served; the body is rendered once at load time.
#[derive(Debug, Clone)]
pub struct CompiledResponse {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
    delay: Option<Duration>,
}

impl CompiledResponse {
    pub fn compile(definition: &ResponseDefinition) -> Result<Self, MappingError> {
        let status = StatusCode::from_u16(definition.status).map_err(|_| {
            MappingError::Response(format!("invalid status code {}", definition.status))
        })?;

        let bodies = [
            definition.body.is_some(),
            definition.json_body.is_some(),
            definition.base64_body.is_some(),
        ];
        if bodies.iter().filter(|set| **set).count() > 1 {
            return Err(MappingError::Response(
                "only one of body, jsonBody, base64Body may be set".to_string(),
            ));
        }

        let mut headers: Vec<(String, String)> = definition
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let body = if let Some(text) = &definition.body {
            Bytes::from(text.clone())
        } else if let Some(json) = &definition.json_body {
            if !definition
                .headers
                .keys()
                .any(|k| k.eq_ignore_ascii_case("content-type"))
            {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
            }
            Bytes::from(json.to_string())
        } else if let Some(encoded) = &definition.base64_body {
            Bytes::from(
                BASE64
                    .decode(encoded)
                    .map_err(|e| MappingError::Response(format!("invalid base64Body: {e}")))?,
            )
        } else {
            Bytes::new()
        };

        Ok(Self {
            status,
            headers,
            body,
            delay: definition.fixed_delay_milliseconds.map(Duration::from_millis),
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn to_response(&self) -> Response<Full<Bytes>> {
        build_response_with_headers(
            self.status,
            self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            self.body.clone(),
        )
    }
}

/// Compiled mapping held by the engine.
#[derive(Debug)]
pub struct Mapping {
    config: MappingConfig,
    priority: u32,
    matcher: StateGatedMatcher,
    response: CompiledResponse,
}

impl Mapping {
    /// Validate and compile a mapping, assigning an id if it has none.
    pub fn compile(mut config: MappingConfig) -> Result<Self, MappingError> {
        let request = CompiledRequestSpec::compile(&config.request)?;
        let gate = ScenarioGate::compile(&config.scenario)?;
        let response = CompiledResponse::compile(&config.response)?;

        if config.id.as_deref().is_none_or(str::is_empty) {
            config.id = Some(uuid::Uuid::new_v4().to_string());
        }

        Ok(Self {
            priority: config.priority.unwrap_or(DEFAULT_PRIORITY),
            matcher: StateGatedMatcher::new(request, gate),
            response,
            config,
        })
    }

    pub fn id(&self) -> &str {
        self.config.id.as_deref().unwrap_or_default()
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn response(&self) -> &CompiledResponse {
        &self.response
    }

    pub fn scenario_name(&self) -> Option<&str> {
        self.matcher.gate().map(ScenarioGate::scenario)
    }

    /// Whether this mapping fires for the request (may transition scenario state).
    pub fn evaluate(&self, request: &MockRequest, store: &ScenarioStore) -> bool {
        self.matcher.evaluate(request, store).is_exact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> MappingConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_mapping_defaults() {
        let mapping = Mapping::compile(config(json!({"request": {"urlPath": "/a"}}))).unwrap();
        assert_eq!(mapping.priority(), DEFAULT_PRIORITY);
        assert_eq!(mapping.response().status(), StatusCode::OK);
        assert!(uuid::Uuid::parse_str(mapping.id()).is_ok());
        assert_eq!(mapping.scenario_name(), None);
    }

    #[test]
    fn test_mapping_keeps_given_id() {
        let mapping = Mapping::compile(config(json!({"id": "m-1"}))).unwrap();
        assert_eq!(mapping.id(), "m-1");
        assert_eq!(mapping.config().id.as_deref(), Some("m-1"));
    }

    #[test]
    fn test_scenario_fields_flattened() {
        let cfg = config(json!({
            "request": {"urlPath": "/a"},
            "scenarioName": "flow",
            "requiredScenarioState": "Started",
            "newScenarioState": "TWO",
            "instanceIdentification": {"source": "cookie", "parameter": "SESSION"}
        }));
        assert_eq!(cfg.scenario.scenario_name.as_deref(), Some("flow"));
        assert_eq!(cfg.scenario.new_scenario_state.as_deref(), Some("TWO"));

        let mapping = Mapping::compile(cfg.clone()).unwrap();
        assert_eq!(mapping.scenario_name(), Some("flow"));

        let serialized = serde_json::to_value(mapping.config()).unwrap();
        assert_eq!(serialized["scenarioName"], "flow");
        assert_eq!(serialized["instanceIdentification"]["parameter"], "SESSION");
    }

    #[test]
    fn test_invalid_parts_reported() {
        let bad_pattern = Mapping::compile(config(json!({
            "request": {"headers": {"A": {"nope": "x"}}}
        })));
        assert!(matches!(bad_pattern, Err(MappingError::Pattern(_))));

        let bad_source = Mapping::compile(config(json!({
            "scenarioName": "s",
            "instanceIdentification": {"source": "header", "parameter": "X"}
        })));
        assert!(matches!(bad_source, Err(MappingError::Scenario(_))));

        let bad_status = Mapping::compile(config(json!({"response": {"status": 1000}})));
        assert!(matches!(bad_status, Err(MappingError::Response(_))));
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let response = CompiledResponse::compile(&ResponseDefinition {
            json_body: Some(json!({"ok": true})),
            ..Default::default()
        })
        .unwrap();
        let rendered = response.to_response();
        assert_eq!(
            rendered.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_base64_body_and_conflicts() {
        let response = CompiledResponse::compile(&ResponseDefinition {
            base64_body: Some("aGk=".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(response.body, Bytes::from_static(b"hi"));

        let conflict = CompiledResponse::compile(&ResponseDefinition {
            body: Some("x".to_string()),
            json_body: Some(json!(1)),
            ..Default::default()
        });
        assert!(conflict.is_err());
    }

    #[test]
    fn test_fixed_delay() {
        let response = CompiledResponse::compile(&ResponseDefinition {
            fixed_delay_milliseconds: Some(25),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(response.delay(), Some(Duration::from_millis(25)));
    }
}
