//! Upload staging area
//!
//! In-flight upload bytes are written to a reserved directory under the root
//! and relocated into the tree once the batch is admitted. A periodic reaper
//! removes anything left behind for longer than the configured age.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};
use tokio::fs;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};

/// Reserved directory holding staged upload files
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Create the staging directory if missing
    pub async fn prepare(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Whether `path` is the staging directory or lies inside it
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.dir)
    }

    /// Rejects paths that point into the staging area
    pub fn guard<'a>(&self, path: &'a Path) -> GatewayResult<&'a Path> {
        if self.contains(path) {
            return Err(GatewayError::validation(
                "Path refers to the upload staging area",
            ));
        }
        Ok(path)
    }

    /// Start a new batch of staged files
    pub fn batch(&self) -> StagedBatch {
        StagedBatch {
            dir: self.dir.clone(),
            files: Vec::new(),
        }
    }

    /// Removes staged files older than `max_age`, returning how many went.
    ///
    /// Per-entry failures are skipped; only an unreadable staging directory
    /// fails the sweep.
    pub async fn sweep(&self, max_age: Duration) -> io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) if !metadata.is_dir() => metadata,
                _ => continue,
            };
            let age = match metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
            {
                Some(age) => age,
                None => continue,
            };

            if age > max_age {
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        info!("Removed stale staged file {}", path.display());
                        removed += 1;
                    }
                    Err(e) => debug!("Could not remove {}: {}", path.display(), e),
                }
            }
        }

        Ok(removed)
    }

    /// Spawns the periodic sweep. The first sweep runs immediately.
    pub fn spawn_reaper(self, period: Duration, max_age: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match self.sweep(max_age).await {
                    Ok(0) => {}
                    Ok(n) => info!("Staging sweep removed {} stale files", n),
                    Err(e) => warn!("Staging sweep of {} failed: {}", self.dir.display(), e),
                }
            }
        })
    }
}

/// A staged upload file awaiting relocation
#[derive(Debug)]
pub struct StagedFile {
    pub original_name: String,
    pub path: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

/// Staged files of one upload request.
///
/// Dropping the batch removes every file not yet committed, so an aborted
/// request never leaves orphans in the staging area.
#[derive(Debug)]
pub struct StagedBatch {
    dir: PathBuf,
    files: Vec<StagedFile>,
}

impl StagedBatch {
    /// Opens a fresh staged file for an incoming upload named `original_name`
    pub async fn create(&mut self, original_name: &str) -> GatewayResult<fs::File> {
        let path = self.dir.join(Uuid::new_v4().simple().to_string());
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        self.files.push(StagedFile {
            original_name: original_name.to_string(),
            path,
            committed: false,
        });
        Ok(file)
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Marks the file at `index` as relocated out of the staging area
    pub fn commit(&mut self, index: usize) {
        if let Some(file) = self.files.get_mut(index) {
            file.committed = true;
        }
    }

    /// Sum of staged file sizes
    pub async fn total_bytes(&self) -> GatewayResult<u64> {
        let mut total = 0u64;
        for file in &self.files {
            total = total.saturating_add(fs::metadata(&file.path).await?.len());
        }
        Ok(total)
    }

    /// Removes every uncommitted staged file now
    pub async fn discard(&mut self) {
        for file in self.files.drain(..).filter(|f| !f.committed) {
            if let Err(e) = fs::remove_file(&file.path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to discard staged file {}: {}", file.path.display(), e);
                }
            }
        }
    }
}

impl Drop for StagedBatch {
    // Blocking removal; a batch holds only a handful of files
    fn drop(&mut self) {
        for file in self.files.iter().filter(|f| !f.committed) {
            if let Err(e) = std::fs::remove_file(&file.path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to clean staged file {}: {}", file.path.display(), e);
                }
            }
        }
    }
}
