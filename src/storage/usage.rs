//! Storage usage accounting
//!
//! Sums the bytes stored under the root for quota admission.

use std::path::{Path, PathBuf};

use log::debug;
use tokio::fs;

/// Total size of every file under `root`, excluding the `staging` subtree.
///
/// Walks with an explicit work list. Entries that cannot be read or stat'ed
/// are left out of the sum instead of failing the walk, so the figure is a
/// best-effort estimate. Symlinked directories are not descended into.
pub async fn used_bytes(root: &Path, staging: &Path) -> u64 {
    let mut total = 0u64;
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    debug!("Stopped reading {}: {}", dir.display(), e);
                    break;
                }
            };

            let path = entry.path();
            if path == staging {
                continue;
            }

            let is_symlink = match entry.file_type().await {
                Ok(file_type) => file_type.is_symlink(),
                Err(_) => continue,
            };

            match fs::metadata(&path).await {
                Ok(meta) if meta.is_dir() => {
                    if !is_symlink {
                        stack.push(path);
                    }
                }
                Ok(meta) => total = total.saturating_add(meta.len()),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    total
}

/// Quota admission: deny only when a finite limit would be exceeded
pub fn admit(current_used: u64, incoming: u64, limit: Option<u64>) -> bool {
    match limit {
        Some(limit) => current_used.saturating_add(incoming) <= limit,
        None => true,
    }
}
