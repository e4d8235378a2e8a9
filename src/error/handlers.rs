//! Error handlers
//!
//! Maps gateway errors onto HTTP status codes and logs them.

use axum::http::StatusCode;
use log::{error, warn};

use crate::error::types::GatewayError;

/// Log a gateway error at a level matching who caused it
pub fn handle_error(err: &GatewayError) {
    match err {
        GatewayError::Io(e) => error!("Gateway I/O failure: {}", e),
        other => warn!("Request rejected: {}", other),
    }
}

/// Convert error to HTTP status code
pub fn status_code(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::QuotaExceeded => StatusCode::PAYLOAD_TOO_LARGE,
        GatewayError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
        GatewayError::PathEscape(_)
        | GatewayError::NotFound(_)
        | GatewayError::Validation(_)
        | GatewayError::Io(_) => StatusCode::BAD_REQUEST,
    }
}
