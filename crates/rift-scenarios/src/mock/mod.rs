//! Mock server: mappings, matching engine and HTTP listener.
//!
//! # Module Structure
//!
//! - `types` - mapping configuration, compiled mappings and responses
//! - `engine` - `MockEngine`, the ordered mapping registry
//! - `handler` - hyper request handling
//! - `server` - the mock listener

mod engine;
mod handler;
mod server;
mod types;

pub use engine::MockEngine;
pub use handler::{handle_mock_request, respond, NOT_MATCHED_BODY};
pub use server::MockServer;
pub use types::{
    CompiledResponse, Mapping, MappingConfig, MappingError, ResponseDefinition, DEFAULT_PRIORITY,
};
