//! Request specification: the `request` block of a mapping.

use super::error::PatternError;
use super::matcher::{compile_full_match, match_multi_value, MatchResult};
use super::multipart::{CompiledMultipartPattern, MultipartSpec};
use super::string_pattern::StringValuePattern;
use crate::request::MockRequest;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Request specification as written in a mapping.
///
/// Header, query parameter, cookie and body patterns are kept as raw JSON and
/// validated by [`CompiledRequestSpec::compile`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    /// Exact match on path and query string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Regex on path and query string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    /// Exact match on the path only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    /// Regex on the path only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path_pattern: Option<String>,
    /// HTTP method; absent or `ANY` matches every method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_parameters: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth_credentials: Option<BasicCredentials>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_patterns: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multipart_patterns: Vec<MultipartSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
enum UrlRule {
    Any,
    Url(String),
    UrlPattern(Arc<Regex>),
    UrlPath(String),
    UrlPathPattern(Arc<Regex>),
}

impl UrlRule {
    fn compile(spec: &RequestSpec) -> Result<Self, PatternError> {
        let set: Vec<&str> = [
            ("url", spec.url.is_some()),
            ("urlPattern", spec.url_pattern.is_some()),
            ("urlPath", spec.url_path.is_some()),
            ("urlPathPattern", spec.url_path_pattern.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();
        if set.len() > 1 {
            return Err(PatternError::ConflictingUrlRules(set.join(", ")));
        }

        let rule = if let Some(url) = &spec.url {
            UrlRule::Url(url.clone())
        } else if let Some(pattern) = &spec.url_pattern {
            UrlRule::UrlPattern(Arc::new(
                compile_full_match(pattern).map_err(|e| e.in_field("urlPattern"))?,
            ))
        } else if let Some(path) = &spec.url_path {
            UrlRule::UrlPath(path.clone())
        } else if let Some(pattern) = &spec.url_path_pattern {
            UrlRule::UrlPathPattern(Arc::new(
                compile_full_match(pattern).map_err(|e| e.in_field("urlPathPattern"))?,
            ))
        } else {
            UrlRule::Any
        };
        Ok(rule)
    }

    fn matches(&self, request: &MockRequest) -> bool {
        match self {
            UrlRule::Any => true,
            UrlRule::Url(url) => request.url() == url.as_str(),
            UrlRule::UrlPattern(regex) => regex.is_match(&request.url()),
            UrlRule::UrlPath(path) => request.path() == path,
            UrlRule::UrlPathPattern(regex) => regex.is_match(request.path()),
        }
    }
}

/// Compiled request specification for runtime evaluation.
#[derive(Debug, Clone)]
pub struct CompiledRequestSpec {
    url: UrlRule,
    method: Option<String>,
    headers: Vec<(String, StringValuePattern)>,
    query_parameters: Vec<(String, StringValuePattern)>,
    cookies: Vec<(String, StringValuePattern)>,
    basic_auth: Option<BasicCredentials>,
    body_patterns: Vec<StringValuePattern>,
    multipart_patterns: Vec<CompiledMultipartPattern>,
}

fn compile_named(
    field: &str,
    patterns: &BTreeMap<String, Value>,
) -> Result<Vec<(String, StringValuePattern)>, PatternError> {
    patterns
        .iter()
        .map(|(name, value)| {
            StringValuePattern::from_value(value)
                .map(|pattern| (name.clone(), pattern))
                .map_err(|e| e.in_field(format!("{field}.{name}")))
        })
        .collect()
}

impl CompiledRequestSpec {
    pub fn compile(spec: &RequestSpec) -> Result<Self, PatternError> {
        let method = spec
            .method
            .as_ref()
            .filter(|m| !m.eq_ignore_ascii_case("ANY"))
            .map(|m| m.to_ascii_uppercase());

        let body_patterns = spec
            .body_patterns
            .iter()
            .enumerate()
            .map(|(i, value)| {
                StringValuePattern::from_value(value)
                    .map_err(|e| e.in_field(format!("bodyPatterns[{i}]")))
            })
            .collect::<Result<_, _>>()?;

        let multipart_patterns = spec
            .multipart_patterns
            .iter()
            .enumerate()
            .map(|(i, part)| {
                CompiledMultipartPattern::compile(part)
                    .map_err(|e| e.in_field(format!("multipartPatterns[{i}]")))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            url: UrlRule::compile(spec)?,
            method,
            headers: compile_named("headers", &spec.headers)?,
            query_parameters: compile_named("queryParameters", &spec.query_parameters)?,
            cookies: compile_named("cookies", &spec.cookies)?,
            basic_auth: spec.basic_auth_credentials.clone(),
            body_patterns,
            multipart_patterns,
        })
    }

    /// Evaluate a request against every configured criterion.
    ///
    /// Cheap checks run first; the body is only looked at when the method,
    /// URL and header criteria already hold.
    pub fn evaluate(&self, request: &MockRequest) -> MatchResult {
        MatchResult::from_bool(self.matches(request))
    }

    fn matches(&self, request: &MockRequest) -> bool {
        if let Some(method) = &self.method {
            if !request.method().eq_ignore_ascii_case(method) {
                return false;
            }
        }

        if !self.url.matches(request) {
            return false;
        }

        let headers_match = self
            .headers
            .iter()
            .all(|(name, pattern)| match_multi_value(pattern, &request.header_values(name)));
        if !headers_match {
            return false;
        }

        let query_match = self
            .query_parameters
            .iter()
            .all(|(name, pattern)| match_multi_value(pattern, &request.query_values(name)));
        if !query_match {
            return false;
        }

        let cookies_match = self
            .cookies
            .iter()
            .all(|(name, pattern)| pattern.matches(request.cookie(name)));
        if !cookies_match {
            return false;
        }

        if let Some(expected) = &self.basic_auth {
            match request.basic_auth() {
                Some((user, pass)) if user == expected.username && pass == expected.password => {}
                _ => return false,
            }
        }

        if !self
            .body_patterns
            .iter()
            .all(|pattern| pattern.matches_bytes(request.body()))
        {
            return false;
        }

        if !self.multipart_patterns.is_empty() {
            let parts = request.multipart_parts();
            if !self.multipart_patterns.iter().all(|p| p.matches(&parts)) {
                return false;
            }
        }

        true
    }
}
