//! Upload ingestion
//!
//! Admits a batch of staged uploads against the quota and relocates each
//! file into its target directory under a collision-free name.

use std::path::Path;

use log::{debug, info, warn};
use tokio::fs;

use crate::error::{GatewayError, GatewayResult};
use crate::storage::naming::{allocate, claim};
use crate::storage::quota::QuotaState;
use crate::storage::staging::{StagedBatch, StagingArea};
use crate::storage::usage::{admit, used_bytes};
use crate::storage::validation::validate_name;

/// Moves every staged file of `batch` into `dir`, returning final names in
/// input order.
///
/// The whole batch is rejected when a configured quota would be exceeded.
/// Any failure leaves the already relocated files in place and removes the
/// rest from the staging area when `batch` is dropped.
pub async fn ingest(
    root: &Path,
    staging: &StagingArea,
    quota: &QuotaState,
    dir: &Path,
    mut batch: StagedBatch,
) -> GatewayResult<Vec<String>> {
    for file in batch.files() {
        validate_name(&file.original_name)?;
    }

    fs::create_dir_all(dir).await?;

    if let Some(limit) = quota.get() {
        let incoming = batch.total_bytes().await?;
        let used = used_bytes(root, staging.path()).await;
        if !admit(used, incoming, Some(limit)) {
            warn!(
                "Rejecting upload of {} bytes: {} used of {} allowed",
                incoming, used, limit
            );
            batch.discard().await;
            return Err(GatewayError::QuotaExceeded);
        }
    }

    let mut saved = Vec::with_capacity(batch.len());
    for index in 0..batch.len() {
        let staged = &batch.files()[index];
        let Relocated { name: final_name, staged_left } =
            relocate(&staged.path, dir, &staged.original_name).await?;
        // A staged copy left behind stays uncommitted so the batch removes it
        if !staged_left {
            batch.commit(index);
        }

        info!(
            "Stored upload {} as {} (real: {})",
            batch.files()[index].original_name,
            final_name,
            dir.join(&final_name).display()
        );
        saved.push(final_name);
    }

    Ok(saved)
}

/// Outcome of moving one staged file into place
struct Relocated {
    name: String,
    /// The staged copy still exists after the move
    staged_left: bool,
}

/// Places `staged` into `dir` without overwriting an existing entry.
///
/// Hard-linking fails on an existing target, so names are claimed without a
/// separate existence check. Filesystems that cannot link fall back to a
/// checked rename.
async fn relocate(staged: &Path, dir: &Path, desired: &str) -> GatewayResult<Relocated> {
    match claim(dir, desired, |target| fs::hard_link(staged, target)).await {
        Ok(name) => {
            let staged_left = match fs::remove_file(staged).await {
                Ok(()) => false,
                Err(e) => {
                    warn!("Failed to unlink staged file {}: {}", staged.display(), e);
                    true
                }
            };
            Ok(Relocated { name, staged_left })
        }
        Err(GatewayError::Io(e)) => {
            debug!("Hard link into {} failed ({}), renaming instead", dir.display(), e);
            let name = allocate(dir, desired).await?;
            fs::rename(staged, dir.join(&name)).await?;
            Ok(Relocated {
                name,
                staged_left: false,
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::{TempDir, tempdir};
    use tokio::io::AsyncWriteExt;

    async fn setup() -> (TempDir, StagingArea) {
        let root = tempdir().unwrap();
        let staging = StagingArea::new(root.path().join(".tmp"));
        staging.prepare().await.unwrap();
        (root, staging)
    }

    async fn stage(batch: &mut StagedBatch, name: &str, bytes: &[u8]) {
        let mut file = batch.create(name).await.unwrap();
        file.write_all(bytes).await.unwrap();
        file.flush().await.unwrap();
    }

    fn staged_count(staging: &StagingArea) -> usize {
        stdfs::read_dir(staging.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_ingest_creates_target_and_suffixes() {
        let (root, staging) = setup().await;
        let quota = QuotaState::default();
        let dir = root.path().join("收件箱/2024");

        let mut batch = staging.batch();
        stage(&mut batch, "报告 (draft).pdf", b"first").await;
        stage(&mut batch, "报告 (draft).pdf", b"second").await;

        let names = ingest(root.path(), &staging, &quota, &dir, batch)
            .await
            .unwrap();

        assert_eq!(names, vec!["报告 (draft).pdf", "报告 (draft) (1).pdf"]);
        assert_eq!(stdfs::read(dir.join("报告 (draft).pdf")).unwrap(), b"first");
        assert_eq!(stdfs::read(dir.join("报告 (draft) (1).pdf")).unwrap(), b"second");
        assert_eq!(staged_count(&staging), 0);
    }

    #[tokio::test]
    async fn test_ingest_rejects_over_quota_batch() {
        let (root, staging) = setup().await;
        stdfs::write(root.path().join("existing.bin"), vec![0u8; 90]).unwrap();
        let quota = QuotaState::new(Some(100));

        let mut batch = staging.batch();
        stage(&mut batch, "small.bin", &[1u8; 5]).await;
        stage(&mut batch, "big.bin", &[1u8; 15]).await;

        let result = ingest(root.path(), &staging, &quota, root.path(), batch).await;

        assert!(matches!(result, Err(GatewayError::QuotaExceeded)));
        assert!(!root.path().join("small.bin").exists());
        assert_eq!(staged_count(&staging), 0);
        assert_eq!(used_bytes(root.path(), staging.path()).await, 90);
    }

    #[tokio::test]
    async fn test_ingest_within_quota() {
        let (root, staging) = setup().await;
        let quota = QuotaState::new(Some(10));

        let mut batch = staging.batch();
        stage(&mut batch, "fits.txt", b"0123456789").await;

        let names = ingest(root.path(), &staging, &quota, root.path(), batch)
            .await
            .unwrap();
        assert_eq!(names, vec!["fits.txt"]);
    }

    #[tokio::test]
    async fn test_ingest_invalid_name_moves_nothing() {
        let (root, staging) = setup().await;
        let quota = QuotaState::default();

        let mut batch = staging.batch();
        stage(&mut batch, "ok.txt", b"x").await;
        stage(&mut batch, "../evil.txt", b"y").await;

        let result = ingest(root.path(), &staging, &quota, root.path(), batch).await;

        assert!(matches!(result, Err(GatewayError::Validation(_))));
        assert!(!root.path().join("ok.txt").exists());
        assert_eq!(staged_count(&staging), 0);
    }

    #[tokio::test]
    async fn test_ingest_mid_batch_failure_cleans_staging() {
        let (root, staging) = setup().await;
        let quota = QuotaState::default();
        let too_long = "x".repeat(300);

        let mut batch = staging.batch();
        stage(&mut batch, "ok.txt", b"first").await;
        stage(&mut batch, &too_long, b"second").await;
        stage(&mut batch, "third.txt", b"third").await;

        let result = ingest(root.path(), &staging, &quota, root.path(), batch).await;

        assert!(matches!(result, Err(GatewayError::Io(_))));
        assert_eq!(staged_count(&staging), 0);
        assert_eq!(stdfs::read(root.path().join("ok.txt")).unwrap(), b"first");
        assert!(!root.path().join("third.txt").exists());
    }

    #[tokio::test]
    async fn test_relocate_unlinks_staged_copy() {
        let (root, staging) = setup().await;
        let mut batch = staging.batch();
        stage(&mut batch, "moved.txt", b"data").await;

        let staged = batch.files()[0].path.clone();
        let relocated = relocate(&staged, root.path(), "moved.txt").await.unwrap();

        assert_eq!(relocated.name, "moved.txt");
        assert!(!relocated.staged_left);
        assert!(!staged.exists());
        assert_eq!(stdfs::read(root.path().join("moved.txt")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_ingest_empty_batch() {
        let (root, staging) = setup().await;
        let quota = QuotaState::new(Some(0));
        let names = ingest(root.path(), &staging, &quota, root.path(), staging.batch())
            .await
            .unwrap();
        assert!(names.is_empty());
    }
}
