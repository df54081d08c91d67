//! s3putsecure Sync - one-way mirroring of a directory tree into a bucket
//!
//! Provides:
//! - Streaming content digests of local files
//! - Glob-based exclusion of paths
//! - GnuPG encryption into a per-run staging area
//! - The sync engine that walks the tree, decides and uploads
//!
//! ## Modules
//!
//! - [`engine`] - Tree walk and encrypt-and-upload pipeline
//! - [`digest`] - MD5 digest of file content
//! - [`exclude`] - Exclusion filter over full walk paths
//! - [`gpg`] - [`IEncryptionProvider`](s3putsecure_core::ports::IEncryptionProvider) backed by `gpg`
//! - [`progress`] - Per-upload transfer rate tracking
//! - [`retry`] - Exponential backoff for transient store failures
//! - [`staging`] - Temporary ciphertext files

pub mod digest;
pub mod engine;
pub mod exclude;
pub mod gpg;
pub mod progress;
pub mod retry;
pub mod staging;

use std::path::PathBuf;

use thiserror::Error;

pub use engine::{BucketStatus, SyncEngine, SyncOptions, SyncResult};
pub use exclude::{ExcludeError, ExclusionFilter};
pub use gpg::{GpgEncryptor, GpgMode};

/// Errors that abort a sync run
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The source root is missing or not a directory
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    /// The target bucket does not exist and creation was not requested
    #[error("Bucket {0} does not exist (use --create to create it)")]
    BucketNotFound(String),

    /// Encryption is enabled but no provider was configured
    #[error("Encryption mode {0} requires an encryption provider")]
    MissingEncryptor(String),

    /// The encryption tool failed; nothing was uploaded for the file
    #[error(transparent)]
    Encryption(#[from] s3putsecure_core::ports::EncryptionError),

    /// An exclude pattern could not be compiled
    #[error(transparent)]
    Exclude(#[from] ExcludeError),

    /// A domain-level error propagated from s3putsecure-core
    #[error("Domain error: {0}")]
    DomainError(#[from] s3putsecure_core::domain::errors::DomainError),
}
