//! Directory listing
//!
//! Enumerates the immediate children of a directory with their metadata,
//! directories first, then by name.

use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::Path;
use std::time::UNIX_EPOCH;

use log::{debug, info};
use tokio::fs;

use crate::error::GatewayResult;
use crate::storage::results::DirectoryEntry;

/// Lists `dir`, leaving out the entry at `hidden` if it is a direct child.
///
/// A child removed between enumeration and stat is skipped. Any other stat
/// failure fails the whole listing.
pub async fn list_directory(dir: &Path, hidden: &Path) -> GatewayResult<Vec<DirectoryEntry>> {
    let mut read_dir = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(child) = read_dir.next_entry().await? {
        let path = child.path();
        if path == hidden {
            continue;
        }

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Entry {} vanished during listing", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let is_directory = metadata.is_dir();
        let modified_at = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|dur| dur.as_millis() as u64)
            .unwrap_or(0);

        entries.push(DirectoryEntry {
            name: child.file_name().to_string_lossy().to_string(),
            is_directory,
            size: if is_directory { None } else { Some(metadata.len()) },
            modified_at,
        });
    }

    entries.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| collate(&a.name, &b.name))
    });

    info!("Listed directory {} - {} entries", dir.display(), entries.len());

    Ok(entries)
}

/// Locale-style name ordering.
///
/// Compares case-folded text first, ranking punctuation before digits before
/// letters. Ties fall back to lowercase-before-uppercase and finally code
/// point order, so distinct names never compare equal.
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = |s: &str| {
        s.chars()
            .flat_map(char::to_lowercase)
            .map(|c| (char_class(c), c))
            .collect::<Vec<_>>()
    };

    primary(a)
        .cmp(&primary(b))
        .then_with(|| case_order(a, b))
        .then_with(|| a.cmp(b))
}

fn char_class(c: char) -> u8 {
    if c.is_whitespace() || c.is_ascii_punctuation() {
        0
    } else if c.is_numeric() {
        1
    } else if c.is_alphabetic() {
        2
    } else {
        3
    }
}

fn case_order(a: &str, b: &str) -> Ordering {
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca == cb {
            continue;
        }
        match (ca.is_lowercase(), cb.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    Ordering::Equal
}
