//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;

/// One immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
    /// `None` for directories
    pub size: Option<u64>,
    /// Milliseconds since the Unix epoch
    pub modified_at: u64,
}

/// Current usage against the configured limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaReport {
    pub used: u64,
    pub limit: Option<u64>,
}

/// Result of a directory listing
#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub entries: Vec<DirectoryEntry>,
    pub quota: QuotaReport,
}

/// Result of an upload batch
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub files: Vec<String>,
    pub quota: QuotaReport,
}
