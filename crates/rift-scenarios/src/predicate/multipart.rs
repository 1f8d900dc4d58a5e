//! Multipart request patterns.

use super::error::PatternError;
use super::matcher::match_multi_value;
use super::string_pattern::StringValuePattern;
use crate::request::RequestPart;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How a multipart pattern is applied to the parts of a request.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MultipartMatchingType {
    /// Every part must match (and there must be at least one).
    All,
    /// At least one part must match.
    #[default]
    Any,
}

/// Multipart pattern as written in a mapping.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MultipartSpec {
    #[serde(default)]
    pub matching_type: MultipartMatchingType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_patterns: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct CompiledMultipartPattern {
    matching_type: MultipartMatchingType,
    headers: Vec<(String, StringValuePattern)>,
    body_patterns: Vec<StringValuePattern>,
}

impl CompiledMultipartPattern {
    pub fn compile(spec: &MultipartSpec) -> Result<Self, PatternError> {
        let headers = spec
            .headers
            .iter()
            .map(|(name, value)| {
                StringValuePattern::from_value(value)
                    .map(|pattern| (name.to_ascii_lowercase(), pattern))
                    .map_err(|e| e.in_field(format!("headers.{name}")))
            })
            .collect::<Result<_, _>>()?;

        let body_patterns = spec
            .body_patterns
            .iter()
            .enumerate()
            .map(|(i, value)| {
                StringValuePattern::from_value(value)
                    .map_err(|e| e.in_field(format!("bodyPatterns[{i}]")))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            matching_type: spec.matching_type,
            headers,
            body_patterns,
        })
    }

    /// Check a single part against the header and body patterns.
    pub fn matches_part(&self, part: &RequestPart) -> bool {
        let headers_match = self
            .headers
            .iter()
            .all(|(name, pattern)| match_multi_value(pattern, &part.header_values(name)));

        headers_match
            && self
                .body_patterns
                .iter()
                .all(|pattern| pattern.matches_bytes(&part.body))
    }

    /// Check the parts of a request.
    pub fn matches(&self, parts: &[RequestPart]) -> bool {
        match self.matching_type {
            MultipartMatchingType::All => {
                !parts.is_empty() && parts.iter().all(|part| self.matches_part(part))
            }
            MultipartMatchingType::Any => parts.iter().any(|part| self.matches_part(part)),
        }
    }
}
