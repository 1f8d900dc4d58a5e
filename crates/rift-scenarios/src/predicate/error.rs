//! Errors raised while compiling request patterns.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("no supported match operator in {pattern}; expected one of: {expected}")]
    UnknownOperator { pattern: String, expected: String },

    #[error("operator '{operator}' expects {expected}")]
    InvalidOperand {
        operator: &'static str,
        expected: &'static str,
    },

    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid JSONPath '{expression}': {message}")]
    InvalidJsonPath { expression: String, message: String },

    #[error("invalid XPath '{expression}': {message}")]
    InvalidXPath { expression: String, message: String },

    #[error("equalToJson operand is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("equalToXml operand is not valid XML: {0}")]
    InvalidXml(String),

    #[error("binaryEqualTo operand is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("only one of url, urlPattern, urlPath, urlPathPattern may be set (found: {0})")]
    ConflictingUrlRules(String),

    #[error("{field}: {source}")]
    InField {
        field: String,
        #[source]
        source: Box<PatternError>,
    },
}

impl PatternError {
    /// Attach the location of the failing pattern.
    pub fn in_field(self, field: impl Into<String>) -> Self {
        PatternError::InField {
            field: field.into(),
            source: Box::new(self),
        }
    }
}
