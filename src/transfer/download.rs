//! File download
//!
//! Opens a stored file positioned at the planned byte window and exposes it
//! as a bounded byte stream together with its response metadata.

use std::io::SeekFrom;
use std::path::Path;

use log::info;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;

use crate::error::GatewayResult;
use crate::transfer::range::RangePlan;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// An opened download, read-only and bounded to `plan`
#[derive(Debug)]
pub struct Download {
    file: File,
    pub plan: RangePlan,
    pub file_name: String,
    pub content_type: String,
}

impl Download {
    pub async fn open(path: &Path, plan: RangePlan) -> GatewayResult<Self> {
        let mut file = File::open(path).await?;
        if plan.start > 0 {
            file.seek(SeekFrom::Start(plan.start)).await?;
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        info!(
            "Starting file download: {} bytes {}-{} of {} ({})",
            path.display(),
            plan.start,
            plan.end(),
            plan.size,
            content_type
        );

        Ok(Self {
            file,
            plan,
            file_name,
            content_type,
        })
    }

    /// `Content-Disposition` value with the UTF-8 percent-encoded file name
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename*=UTF-8''{}",
            urlencoding::encode(&self.file_name)
        )
    }

    /// Reader limited to exactly `plan.length` bytes
    pub fn into_reader(self) -> Take<File> {
        self.file.take(self.plan.length)
    }

    /// Byte stream over [`Download::into_reader`]. Dropping it closes the file.
    pub fn into_stream(self, buffer_size: usize) -> ReaderStream<Take<File>> {
        ReaderStream::with_capacity(self.into_reader(), buffer_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::range::plan_range;
    use tempfile::tempdir;

    fn sample() -> Vec<u8> {
        (0..1000u32).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_reads_exact_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, sample()).unwrap();

        let plan = plan_range(1000, Some("bytes=200-499")).unwrap();
        let download = Download::open(&path, plan).await.unwrap();
        let mut body = Vec::new();
        download.into_reader().read_to_end(&mut body).await.unwrap();

        assert_eq!(body.len(), 300);
        assert_eq!(body, &sample()[200..500]);
    }

    #[tokio::test]
    async fn test_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("报告 (draft).pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let download = Download::open(&path, plan_range(4, None).unwrap())
            .await
            .unwrap();
        assert_eq!(download.content_type, "application/pdf");
        assert_eq!(
            download.content_disposition(),
            "attachment; filename*=UTF-8''%E6%8A%A5%E5%91%8A%20%28draft%29.pdf"
        );
    }

    #[tokio::test]
    async fn test_unknown_extension_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.zzzunknown");
        std::fs::write(&path, b"x").unwrap();

        let download = Download::open(&path, plan_range(1, None).unwrap())
            .await
            .unwrap();
        assert_eq!(download.content_type, FALLBACK_CONTENT_TYPE);
    }
}
