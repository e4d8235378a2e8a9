//! Transfer module
//!
//! Serves stored file content, honouring HTTP byte-range requests so
//! interrupted downloads can resume.

pub mod download;
pub mod range;

pub use download::Download;
pub use range::{RangePlan, plan_range};
