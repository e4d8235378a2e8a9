//! Server middleware
//!
//! Provides request logging and cross-origin policy.

pub mod cors;
pub mod logging;

pub use cors::cors_layer;
pub use logging::log_requests;
