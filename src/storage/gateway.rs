//! File gateway
//!
//! Binds the storage root, staging area and quota state together and
//! exposes every user-facing filesystem operation. Each operation resolves
//! its user-supplied path beneath the root before touching the disk.

use std::path::{Path, PathBuf};

use log::info;
use serde_json::Value;
use tokio::fs;

use crate::error::{GatewayError, GatewayResult};
use crate::storage::listing::list_directory;
use crate::storage::operations::{make_directory, remove_entry, rename_entry};
use crate::storage::quota::{QuotaState, parse_limit};
use crate::storage::results::{ListResult, QuotaReport, UploadResult};
use crate::storage::staging::{StagedBatch, StagingArea};
use crate::storage::upload::ingest;
use crate::storage::usage::used_bytes;
use crate::storage::validation::{require, resolve, validate_name};
use crate::transfer::{Download, plan_range};

pub struct FileGateway {
    root: PathBuf,
    staging: StagingArea,
    quota: QuotaState,
}

impl FileGateway {
    /// Opens the gateway over `root`, creating it and the staging directory
    /// `staging_name` beneath it when missing.
    pub async fn open(
        root: impl AsRef<Path>,
        staging_name: &str,
        default_quota: Option<u64>,
    ) -> GatewayResult<Self> {
        validate_name(staging_name)?;

        fs::create_dir_all(root.as_ref()).await?;
        let root = fs::canonicalize(root.as_ref()).await?;

        let staging = StagingArea::new(root.join(staging_name));
        staging.prepare().await?;

        info!(
            "Storage root {} (staging: {}, quota: {})",
            root.display(),
            staging.path().display(),
            default_quota.map_or("unlimited".to_string(), |q| format!("{q} bytes"))
        );

        Ok(Self {
            root,
            staging,
            quota: QuotaState::new(default_quota),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn quota(&self) -> &QuotaState {
        &self.quota
    }

    /// Resolves a user directory path, refusing the staging area
    fn locate(&self, user_path: Option<&str>) -> GatewayResult<PathBuf> {
        let path = resolve(&self.root, user_path)?;
        self.staging.guard(&path)?;
        Ok(path)
    }

    pub async fn quota_report(&self) -> QuotaReport {
        QuotaReport {
            used: used_bytes(&self.root, self.staging.path()).await,
            limit: self.quota.get(),
        }
    }

    /// Sets the limit from a client value; null or negative means unlimited
    pub async fn set_quota(&self, limit: Option<&Value>) -> GatewayResult<QuotaReport> {
        let limit = parse_limit(limit)?;
        self.quota.set(limit);
        info!(
            "Quota set to {}",
            limit.map_or("unlimited".to_string(), |l| format!("{l} bytes"))
        );
        Ok(self.quota_report().await)
    }

    pub async fn list(&self, path: Option<&str>) -> GatewayResult<ListResult> {
        let dir = self.locate(path)?;
        let entries = list_directory(&dir, self.staging.path()).await?;
        Ok(ListResult {
            entries,
            quota: self.quota_report().await,
        })
    }

    pub async fn mkdir(&self, dir_path: Option<&str>, name: Option<&str>) -> GatewayResult<String> {
        let name = require(name, "name")?;
        let parent = self.locate(dir_path)?;
        make_directory(&parent, name).await
    }

    pub async fn rename(
        &self,
        dir_path: Option<&str>,
        old_name: Option<&str>,
        new_name: Option<&str>,
    ) -> GatewayResult<String> {
        let (Some(old_name), Some(new_name)) = (
            old_name.filter(|s| !s.is_empty()),
            new_name.filter(|s| !s.is_empty()),
        ) else {
            return Err(GatewayError::validation("oldName and newName required"));
        };
        let dir = self.locate(dir_path)?;
        rename_entry(&self.staging, &dir, old_name, new_name).await
    }

    pub async fn delete(&self, dir_path: Option<&str>, name: Option<&str>) -> GatewayResult<()> {
        let name = require(name, "name")?;
        let dir = self.locate(dir_path)?;
        remove_entry(&self.staging, &dir, name).await
    }

    /// Start collecting staged files for an upload request
    pub fn begin_upload(&self) -> StagedBatch {
        self.staging.batch()
    }

    pub async fn upload(
        &self,
        dir_path: Option<&str>,
        batch: StagedBatch,
    ) -> GatewayResult<UploadResult> {
        let dir = self.locate(dir_path)?;
        let files = ingest(&self.root, &self.staging, &self.quota, &dir, batch).await?;
        Ok(UploadResult {
            files,
            quota: self.quota_report().await,
        })
    }

    /// Opens `file_path` for download positioned at the requested byte window
    pub async fn download(
        &self,
        file_path: Option<&str>,
        range: Option<&str>,
    ) -> GatewayResult<Download> {
        let file_path = require(file_path, "filePath")?;
        let full = self.locate(Some(file_path))?;

        let metadata = match fs::metadata(&full).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GatewayError::NotFound(file_path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.is_dir() {
            return Err(GatewayError::validation("Cannot download a directory"));
        }

        let plan = plan_range(metadata.len(), range)?;
        Download::open(&full, plan).await
    }
}
