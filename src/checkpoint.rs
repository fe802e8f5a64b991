//! Atomic file writes and per-fragment completion records for resumable batch extraction.
//!
//! A fragment is only trusted when its completion record says it is complete and the MD5 digest
//! of the file on disk matches the recorded one. A fragment left behind by an interrupted run
//! has no matching record and is fetched again.

use crate::error::WellboreError;
use crate::table::Table;

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write a file via a uniquely named temporary file in the same directory followed by a rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    write_with_mode(path, contents, None)
}

/// As [write_atomic], with the file readable and writable by the owner only.
pub fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    write_with_mode(path, contents, Some(0o600))
}

fn write_with_mode(path: &Path, contents: &[u8], mode: Option<u32>) -> io::Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{:?} is not a file path", path))
    })?;
    let tmp = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        uuid::Uuid::new_v4()
    ));
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(mode) = mode {
            options.mode(mode);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    let result = options
        .open(&tmp)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|_| std::fs::rename(&tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

/// Completion record stored next to a fragment.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Checkpoint {
    pub complete: bool,
    /// Number of data rows in the fragment
    pub rows: usize,
    /// MD5 digest of the fragment, absent for empty results which write no fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
}

/// Path of the completion record belonging to a fragment.
pub fn checkpoint_path(fragment: &Path) -> PathBuf {
    let mut name = fragment
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".done");
    fragment.with_file_name(name)
}

impl Checkpoint {
    /// Load the completion record of a fragment. Missing or unreadable records yield `None`.
    pub fn load(fragment: &Path) -> Option<Self> {
        let bytes = std::fs::read(checkpoint_path(fragment)).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(checkpoint) => Some(checkpoint),
            Err(err) => {
                tracing::warn!("Ignoring invalid checkpoint for {:?}: {}", fragment, err);
                None
            }
        }
    }

    /// Whether a fragment was completely written by an earlier run.
    pub fn is_satisfied(fragment: &Path) -> bool {
        match Self::load(fragment) {
            Some(checkpoint) if checkpoint.complete => match &checkpoint.md5 {
                None => checkpoint.rows == 0,
                Some(md5) => std::fs::read(fragment)
                    .map(|bytes| &digest(&bytes) == md5)
                    .unwrap_or(false),
            },
            _ => false,
        }
    }
}

fn digest(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Write a table to a fragment followed by its completion record.
///
/// An empty table writes no fragment, only a record with zero rows.
pub fn write_fragment(fragment: &Path, table: &Table) -> Result<Checkpoint, WellboreError> {
    let checkpoint = if table.is_empty() {
        Checkpoint {
            complete: true,
            rows: 0,
            md5: None,
        }
    } else {
        let bytes = table.to_csv_bytes()?;
        write_atomic(fragment, &bytes)?;
        Checkpoint {
            complete: true,
            rows: table.len(),
            md5: Some(digest(&bytes)),
        }
    };
    write_atomic(&checkpoint_path(fragment), &serde_json::to_vec(&checkpoint)?)?;
    Ok(checkpoint)
}

/// Remove a fragment and its completion record, if present.
pub fn remove_fragment(fragment: &Path) -> io::Result<()> {
    for path in [fragment.to_path_buf(), checkpoint_path(fragment)] {
        match std::fs::remove_file(&path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
            _ => {}
        }
    }
    Ok(())
}
