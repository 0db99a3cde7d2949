//! Admin REST API for expectation management.
//!
//! This module provides a REST API for:
//! - Registering, retrieving and removing expectations
//! - Inspecting and clearing the request log
//! - Health and metrics endpoints
//!
//! The API listens on its own port (default: 1080 for mocks, 1090 for admin).

mod handlers;
mod router;
mod server;
pub(crate) mod types;

pub use server::AdminApiServer;
