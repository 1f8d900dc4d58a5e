//! Instance key resolution.
//!
//! An instance identification block names where the instance key lives on
//! the request:
//!
//! ```yaml
//! instanceIdentification:
//!   source: cookie          # none | urlPath | queryParameter | cookie
//!   parameter: SESSION
//! ```
//!
//! For `urlPath` the parameter is a regex that must match the whole path; its
//! first capturing group is the key.

use super::ScenarioError;
use crate::request::MockRequest;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SOURCE_NONE: &str = "none";
const SOURCE_URL_PATH: &str = "urlPath";
const SOURCE_QUERY_PARAMETER: &str = "queryParameter";
const SOURCE_COOKIE: &str = "cookie";

/// Instance identification as written in a mapping.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceIdentification {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// Compiled instance source.
#[derive(Debug, Clone, Default)]
pub enum InstanceSource {
    #[default]
    None,
    UrlPath(Arc<Regex>),
    QueryParameter(String),
    Cookie(String),
}

impl InstanceSource {
    /// Compile an optional identification block. Absent means [`InstanceSource::None`].
    pub fn compile(config: Option<&InstanceIdentification>) -> Result<Self, ScenarioError> {
        match config {
            None => Ok(InstanceSource::None),
            Some(config) => Self::from_parts(&config.source, config.parameter.as_deref()),
        }
    }

    pub fn from_parts(source: &str, parameter: Option<&str>) -> Result<Self, ScenarioError> {
        let required = || {
            parameter
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ScenarioError::MissingInstanceParameter(source.to_string()))
        };

        match source {
            SOURCE_NONE => Ok(InstanceSource::None),
            SOURCE_URL_PATH => {
                let pattern = required()?;
                let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    ScenarioError::InvalidInstancePattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                Ok(InstanceSource::UrlPath(Arc::new(regex)))
            }
            SOURCE_QUERY_PARAMETER => Ok(InstanceSource::QueryParameter(required()?.to_string())),
            SOURCE_COOKIE => Ok(InstanceSource::Cookie(required()?.to_string())),
            other => Err(ScenarioError::UnknownInstanceSource(other.to_string())),
        }
    }

    /// Resolve the instance key for a request. `None` means use the default instance.
    pub fn resolve(&self, request: &MockRequest) -> Option<String> {
        match self {
            InstanceSource::None => None,
            InstanceSource::UrlPath(regex) => regex
                .captures(request.path())
                .and_then(|captures| captures.get(1))
                .map(|m| m.as_str().to_string()),
            InstanceSource::QueryParameter(name) => request.query_param(name).map(str::to_string),
            InstanceSource::Cookie(name) => request.cookie(name).map(str::to_string),
        }
    }
}

/// One-shot resolution from raw configuration values.
///
/// Fails on a misconfigured source instead of treating it as "no instance".
pub fn resolve_instance(
    source: &str,
    parameter: Option<&str>,
    request: &MockRequest,
) -> Result<Option<String>, ScenarioError> {
    Ok(InstanceSource::from_parts(source, parameter)?.resolve(request))
}
