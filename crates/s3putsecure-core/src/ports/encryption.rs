//! Encryption provider port (driven/secondary port)
//!
//! Encrypts a plaintext file into a staging location before upload. The
//! shipped implementation shells out to GnuPG; the trait keeps the sync
//! engine independent of the tool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while encrypting a file
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The encryption program could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The encryption program exited unsuccessfully
    #[error("encryption of {path} failed ({status}): {stderr}")]
    Failed {
        /// Source file being encrypted
        path: PathBuf,
        /// Exit status description
        status: String,
        /// Captured standard error of the tool
        stderr: String,
    },

    /// The encryption program did not finish in time
    #[error("encryption of {path} timed out after {timeout:?}")]
    Timeout {
        /// Source file being encrypted
        path: PathBuf,
        /// Configured limit
        timeout: Duration,
    },

    /// Talking to the child process failed
    #[error("I/O error while encrypting {path}: {source}")]
    Io {
        /// Source file being encrypted
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Port trait for file encryption
#[async_trait::async_trait]
pub trait IEncryptionProvider: Send + Sync {
    /// Short human-readable description, e.g. "public-key for alice"
    fn describe(&self) -> String;

    /// Encrypts `source` and writes the ciphertext to `staging`
    ///
    /// `staging` may already exist and is overwritten. On error the content
    /// of `staging` is unspecified; callers are responsible for removing it.
    async fn encrypt(&self, source: &Path, staging: &Path) -> Result<(), EncryptionError>;
}
