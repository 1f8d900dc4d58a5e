//! Rift scenarios: an HTTP mock server whose rules can be gated on
//! per-session scenario state.
//!
//! A [`mock::MockEngine`] holds compiled mappings and the shared
//! [`scenario::ScenarioStore`]; the mock listener answers requests from it
//! and the [`admin_api`] inspects and edits both.

pub mod admin_api;
pub mod config;
pub mod metrics;
pub mod mock;
pub mod predicate;
pub mod request;
pub mod scenario;

pub use config::Config;
pub use mock::{MappingConfig, MockEngine, MockServer};
pub use request::MockRequest;
pub use scenario::{ScenarioStore, DEFAULT_INSTANCE, STARTED};
