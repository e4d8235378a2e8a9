//! Storage operations
//!
//! Directory creation, rename and delete inside an already resolved
//! directory. Each name is validated as a single path segment first.

use std::io::ErrorKind;
use std::path::Path;

use log::info;
use tokio::fs;

use crate::error::{GatewayError, GatewayResult};
use crate::storage::naming::{allocate, claim};
use crate::storage::staging::StagingArea;
use crate::storage::validation::validate_name;

/// Creates directory `name` in `parent`, suffixing on collision.
///
/// The parent must already exist; intermediate directories are not created.
pub async fn make_directory(parent: &Path, name: &str) -> GatewayResult<String> {
    let name = validate_name(name)?;
    let final_name = claim(parent, name, |path| fs::create_dir(path)).await?;

    info!(
        "Created directory {} (real: {})",
        final_name,
        parent.join(&final_name).display()
    );

    Ok(final_name)
}

/// Renames `old_name` to a collision-free variant of `new_name` within `dir`.
///
/// The free-name check and the rename are two steps; a concurrent writer
/// taking the same name in between is not detected.
pub async fn rename_entry(
    staging: &StagingArea,
    dir: &Path,
    old_name: &str,
    new_name: &str,
) -> GatewayResult<String> {
    let old_name = validate_name(old_name)?;
    let new_name = validate_name(new_name)?;

    let from = dir.join(old_name);
    staging.guard(&from)?;

    match fs::symlink_metadata(&from).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(GatewayError::NotFound(old_name.to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    let final_name = allocate(dir, new_name).await?;
    let to = dir.join(&final_name);
    fs::rename(&from, &to).await?;

    info!(
        "Renamed {} to {} (real: {})",
        old_name,
        final_name,
        to.display()
    );

    Ok(final_name)
}

/// Removes `name` from `dir`, recursing into directories.
///
/// An entry that is already gone counts as removed.
pub async fn remove_entry(staging: &StagingArea, dir: &Path, name: &str) -> GatewayResult<()> {
    let name = validate_name(name)?;
    let target = dir.join(name);
    staging.guard(&target)?;

    let metadata = match fs::symlink_metadata(&target).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(&target).await
    } else {
        fs::remove_file(&target).await
    };

    match result {
        Ok(()) => {
            info!("Deleted {} (real: {})", name, target.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::{TempDir, tempdir};

    fn setup() -> (TempDir, StagingArea) {
        let root = tempdir().unwrap();
        let staging = StagingArea::new(root.path().join(".tmp"));
        stdfs::create_dir(staging.path()).unwrap();
        (root, staging)
    }

    #[tokio::test]
    async fn test_make_directory_with_collision() {
        let (root, _staging) = setup();
        assert_eq!(make_directory(root.path(), "照片").await.unwrap(), "照片");
        assert_eq!(make_directory(root.path(), "照片").await.unwrap(), "照片 (1)");
        assert!(root.path().join("照片 (1)").is_dir());
    }

    #[tokio::test]
    async fn test_make_directory_requires_parent() {
        let (root, _staging) = setup();
        let missing = root.path().join("no/such/parent");
        assert!(matches!(
            make_directory(&missing, "child").await,
            Err(GatewayError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_make_directory_rejects_nested_name() {
        let (root, _staging) = setup();
        assert!(matches!(
            make_directory(root.path(), "a/b").await,
            Err(GatewayError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_onto_existing_name() {
        let (root, staging) = setup();
        stdfs::write(root.path().join("a.txt"), b"from a").unwrap();
        stdfs::write(root.path().join("b.txt"), b"original b").unwrap();

        let name = rename_entry(&staging, root.path(), "a.txt", "b.txt")
            .await
            .unwrap();

        assert_eq!(name, "b (1).txt");
        assert!(!root.path().join("a.txt").exists());
        assert_eq!(stdfs::read(root.path().join("b.txt")).unwrap(), b"original b");
        assert_eq!(stdfs::read(root.path().join("b (1).txt")).unwrap(), b"from a");
    }

    #[tokio::test]
    async fn test_rename_missing_source() {
        let (root, staging) = setup();
        assert!(matches!(
            rename_entry(&staging, root.path(), "ghost.txt", "x.txt").await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_refuses_staging_area() {
        let (root, staging) = setup();
        assert!(matches!(
            rename_entry(&staging, root.path(), ".tmp", "uploads").await,
            Err(GatewayError::Validation(_))
        ));
        assert!(staging.path().is_dir());
    }

    #[tokio::test]
    async fn test_remove_entry_is_idempotent() {
        let (root, staging) = setup();
        stdfs::write(root.path().join("once.txt"), b"x").unwrap();

        remove_entry(&staging, root.path(), "once.txt").await.unwrap();
        remove_entry(&staging, root.path(), "once.txt").await.unwrap();
        remove_entry(&staging, root.path(), "never-existed").await.unwrap();
        assert!(!root.path().join("once.txt").exists());
    }

    #[tokio::test]
    async fn test_remove_entry_recursive() {
        let (root, staging) = setup();
        stdfs::create_dir_all(root.path().join("tree/branch/leaf")).unwrap();
        stdfs::write(root.path().join("tree/branch/leaf/f"), b"x").unwrap();

        remove_entry(&staging, root.path(), "tree").await.unwrap();
        assert!(!root.path().join("tree").exists());
    }
}
