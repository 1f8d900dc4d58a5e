//! Admin REST API for mappings and scenario state.
//!
//! This module provides a REST API for:
//! - Listing, setting and deleting scenario instance states
//! - Registering, listing and removing mappings
//! - Health and metrics endpoints
//!
//! The API listens on a configurable port (default: 2525).

mod handlers;
mod router;
mod server;
pub(crate) mod types;

pub use server::AdminApiServer;
