//! Response rendering
//!
//! Success payloads are wrapped as `{ok: true, ...}` and failures as
//! `{ok: false, error}`. Unsatisfiable ranges answer with an empty body.

use axum::Json;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::GatewayError;
use crate::error::handlers::{handle_error, status_code};
use crate::transfer::Download;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    ok: bool,
    #[serde(flatten)]
    payload: T,
}

pub fn success<T: Serialize>(payload: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, payload })
}

#[derive(Debug, Serialize)]
pub struct NameResponse {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct EmptyResponse {}

#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

/// Gateway error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        handle_error(&self.0);
        let status = status_code(&self.0);

        if let GatewayError::RangeNotSatisfiable { size } = self.0 {
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            return (status, headers).into_response();
        }

        let body = ErrorBody {
            ok: false,
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Streams a download with its range, type and disposition headers
pub fn download_response(download: Download, buffer_size: usize) -> Response {
    let plan = download.plan;
    let mut headers = HeaderMap::new();

    let content_type = HeaderValue::from_str(&download.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(plan.length));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(range) = plan.content_range() {
        if let Ok(value) = HeaderValue::from_str(&range) {
            headers.insert(header::CONTENT_RANGE, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&download.content_disposition()) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    let status = if plan.is_partial() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let body = Body::from_stream(download.into_stream(buffer_size));
    (status, headers, body).into_response()
}
