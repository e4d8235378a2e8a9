//! File system storage management
//!
//! Maps untrusted path and name strings onto the storage root: path
//! containment, collision-free naming, usage accounting, listing, uploads
//! and entry mutation.

pub mod gateway;
pub mod listing;
pub mod naming;
pub mod operations;
pub mod quota;
pub mod results;
pub mod staging;
pub mod upload;
pub mod usage;
pub mod validation;

pub use gateway::FileGateway;
pub use results::{DirectoryEntry, ListResult, QuotaReport, UploadResult};
pub use staging::{StagedBatch, StagingArea};
