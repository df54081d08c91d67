//! Staging area for ciphertext
//!
//! One temporary directory per run holds the encrypted copies waiting to be
//! uploaded. File names derive from the sanitized logical key plus a
//! sequence number, so `x/notes.txt` and `y/notes.txt` never share a
//! staging file. Each [`StagedFile`] removes itself when dropped, and the
//! directory goes away with the [`StagingArea`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use s3putsecure_core::domain::newtypes::LogicalKey;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Longest sanitized key kept in a staging file name
const MAX_NAME_LEN: usize = 200;

/// Per-run temporary directory for encrypted files
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    next_seq: AtomicU64,
}

impl StagingArea {
    /// Creates the staging directory inside `parent`, or in the system
    /// temporary directory when `parent` is `None`
    ///
    /// # Errors
    /// Returns the I/O error if the directory cannot be created
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("s3putsecure-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "staging directory created");
        Ok(Self {
            dir,
            next_seq: AtomicU64::new(0),
        })
    }

    /// Location of the staging directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reserves a staging path for `key`
    ///
    /// Nothing is created on disk; the returned guard deletes whatever ends
    /// up at the path when it is dropped.
    pub fn stage(&self, key: &LogicalKey) -> StagedFile {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let sanitized = key.sanitized();
        // Keep the tail: it carries the base name
        let name = if sanitized.len() > MAX_NAME_LEN {
            &sanitized[sanitized.len() - MAX_NAME_LEN..]
        } else {
            sanitized.as_str()
        };
        StagedFile {
            path: self.dir.path().join(format!("{seq:06}-{name}.gpg")),
        }
    }
}

/// Guard over a staging file path; removes the file on drop
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Path the ciphertext is written to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "staging file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove staging file"),
        }
    }
}
