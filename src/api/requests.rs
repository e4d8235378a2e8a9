//! Request payloads
//!
//! JSON bodies and query strings accepted by the API. Every field is
//! optional here; required fields are enforced by the gateway so that a
//! missing field yields the same error shape as any other rejection.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub file_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuotaRequest {
    pub limit: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MkdirRequest {
    pub dir_path: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub dir_path: Option<String>,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub dir_path: Option<String>,
    pub name: Option<String>,
}

/// Parses a JSON body, treating an empty body as `{}`
pub fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> GatewayResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::validation(format!("Invalid JSON body: {e}")))
}
