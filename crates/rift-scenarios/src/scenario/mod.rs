//! Concurrent scenario state engine.
//!
//! Scenarios track state per *instance* rather than globally, so concurrent
//! clients (one per session cookie, URL segment, query parameter value...) can
//! each walk their own sequence of mocked responses.
//!
//! - [`ScenarioStore`] holds scenario → instance → state.
//! - [`InstanceSource`] derives the instance key from a request.
//! - [`StateGatedMatcher`] ties request matching to atomic state transitions.

mod matcher;
mod resolver;
mod store;

pub use matcher::{ScenarioGate, ScenarioGateConfig, StateGatedMatcher};
pub use resolver::{resolve_instance, InstanceIdentification, InstanceSource};
pub use store::{ScenarioSnapshot, ScenarioStore};

use thiserror::Error;

/// Initial state of every scenario instance.
pub const STARTED: &str = "Started";

/// Instance key used when a scenario has no instance identification.
pub const DEFAULT_INSTANCE: &str = "$ID";

/// Scenario configuration errors.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(
        "unknown instance identification source '{0}' (expected one of: none, urlPath, queryParameter, cookie)"
    )]
    UnknownInstanceSource(String),

    #[error("instance identification source '{0}' requires a parameter")]
    MissingInstanceParameter(String),

    #[error("invalid instance path pattern '{pattern}': {source}")]
    InvalidInstancePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("'{0}' requires 'scenarioName' to be set")]
    MissingScenarioName(&'static str),
}
