//! Object store port (driven/secondary port)
//!
//! This module defines the interface for interacting with the bucket that
//! receives the mirrored files. The primary implementation targets Amazon S3
//! (and S3-compatible endpoints) via `aws-sdk-s3`.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//!   Adapters wrap their failures in [`StoreError`] so the sync engine can tell
//!   transient failures from permanent ones by downcasting.
//! - The plaintext digest travels inside the [`UploadRequest`]; adapters must
//!   attach it to the same request that writes the content, so the digest is
//!   recorded before any content byte lands and never describes content the
//!   object does not hold.
//! - The `progress` callback in `put_object` is called with
//!   `(bytes_sent, total_bytes)`.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::newtypes::{BucketName, ContentDigest, LogicalKey};
use crate::domain::record::RemoteObject;

/// Default name of the custom metadata entry holding the plaintext digest
pub const DEFAULT_DIGEST_METADATA_KEY: &str = "s3putsecure-md5";

/// Progress callback: `(bytes_sent, total_bytes)`
pub type ProgressFn<'a> = &'a mut (dyn FnMut(u64, u64) + Send);

/// Errors reported by object store adapters
#[derive(Debug, Error)]
pub enum StoreError {
    /// The bucket does not exist
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// A failure that may succeed when retried (network, throttling, 5xx)
    #[error("Transient store error: {0}")]
    Transient(String),

    /// The store refused the request (permissions, invalid request, 4xx)
    #[error("Request rejected by store: {0}")]
    Rejected(String),

    /// Reading the local file to upload failed
    #[error("Failed to read upload source {path}: {source}")]
    Source {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Returns true if retrying the operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Everything needed to write one object
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Target bucket
    pub bucket: BucketName,
    /// Target key
    pub key: LogicalKey,
    /// File whose bytes are uploaded (ciphertext when encryption is active)
    pub source: PathBuf,
    /// Plaintext digest recorded as custom metadata
    pub digest: ContentDigest,
}

/// Port trait for object storage operations
///
/// ## Implementation Notes
///
/// - `head_object` is a read-only lookup; a missing object is `Ok(None)`,
///   not an error.
/// - Implementations should not retry internally; the sync engine owns
///   the retry policy.
#[async_trait::async_trait]
pub trait IObjectStore: Send + Sync {
    /// Returns true if the bucket exists and is accessible
    async fn bucket_exists(&self, bucket: &BucketName) -> anyhow::Result<bool>;

    /// Creates the bucket
    async fn create_bucket(&self, bucket: &BucketName) -> anyhow::Result<()>;

    /// Looks up an object and its stored digest metadata
    ///
    /// # Returns
    /// `None` if no object exists under `key`
    async fn head_object(
        &self,
        bucket: &BucketName,
        key: &LogicalKey,
    ) -> anyhow::Result<Option<RemoteObject>>;

    /// Uploads `request.source` under `request.key`, recording the digest
    /// as metadata in the same write
    ///
    /// # Returns
    /// Number of bytes uploaded
    async fn put_object(
        &self,
        request: &UploadRequest,
        progress: ProgressFn<'_>,
    ) -> anyhow::Result<u64>;
}
