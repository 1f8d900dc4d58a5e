//! Admin API handlers grouped by resource.

pub mod mappings;
pub mod scenarios;
pub mod system;
