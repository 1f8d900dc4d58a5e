//! Request pattern matching for mock mappings.
//!
//! A mapping's `request` block is deserialized into a [`RequestSpec`], where
//! every value pattern is kept as the raw JSON object it was written as. The
//! spec is then compiled once into a [`CompiledRequestSpec`] that evaluates
//! requests without re-parsing anything.
//!
//! # Module Structure
//!
//! - `matcher` - `MatchResult` and shared helpers (full-match regex, multi-value fields)
//! - `string_pattern` - value patterns (`equalTo`, `matchesJsonPath`, `absent`, ...)
//! - `body_matcher` - JSON, XML and XPath comparison used by value patterns
//! - `multipart` - multipart part patterns
//! - `request_spec` - the full request specification
//! - `error` - compilation errors

mod body_matcher;
mod error;
mod matcher;
mod multipart;
mod request_spec;
mod string_pattern;

pub use body_matcher::{json_equals, JsonComparison, XPathMatcher, XmlTree};
pub use error::PatternError;
pub use matcher::{compile_full_match, match_multi_value, MatchResult};
pub use multipart::{CompiledMultipartPattern, MultipartMatchingType, MultipartSpec};
pub use request_spec::{BasicCredentials, CompiledRequestSpec, RequestSpec};
pub use string_pattern::{operator_keys, StringValuePattern};
