//! Collision-free naming
//!
//! Derives `stem (n).ext` variants of a desired name until one is free in
//! the target directory.

use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use log::debug;
use tokio::fs;

use crate::error::GatewayResult;

/// Splits a file name at its last extension separator.
///
/// A leading dot does not start an extension, so `.bashrc` has none.
pub fn split_name_ext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Candidate names in allocation order: the desired name, then `stem (1).ext`, ...
pub fn candidates(desired: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, ext) = split_name_ext(desired);
    std::iter::once(desired.to_string()).chain((1u64..).map(move |n| format!("{stem} ({n}){ext}")))
}

/// Returns the first candidate for which no entry exists in `dir`.
///
/// The existence check and the caller's subsequent write are not atomic;
/// prefer [`claim`] where the write itself can fail on an existing target.
pub async fn allocate(dir: &Path, desired: &str) -> GatewayResult<String> {
    for candidate in candidates(desired) {
        match fs::symlink_metadata(dir.join(&candidate)).await {
            Ok(_) => continue,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(candidate),
            Err(e) => return Err(e.into()),
        }
    }
    unreachable!("candidate sequence is unbounded")
}

/// Places an entry under the first free candidate name using an exclusive
/// operation, advancing to the next candidate whenever it reports
/// `AlreadyExists`.
pub async fn claim<F, Fut>(dir: &Path, desired: &str, mut create: F) -> GatewayResult<String>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    for candidate in candidates(desired) {
        match create(dir.join(&candidate)).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Name {} taken in {}, trying next", candidate, dir.display());
            }
            Err(e) => return Err(e.into()),
        }
    }
    unreachable!("candidate sequence is unbounded")
}
