//! Sync decision use case
//!
//! Looks up the remote counterpart of a local file and classifies the pair.
//! Only content identity matters: the plaintext digest stored as object
//! metadata is compared with the local digest. Modification times, sizes
//! and the store's own checksum (which describes ciphertext) are ignored.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::trace;

use crate::domain::newtypes::{BucketName, LogicalKey};
use crate::domain::record::{LocalFileRecord, RemoteObject, SyncDecision};
use crate::ports::IObjectStore;

/// Classifies a local file against the remote object under the same key
///
/// - `Skip` iff the object exists and its stored digest equals the local
///   digest (exact, case-sensitive string match)
/// - `Create` iff no object exists
/// - `Replace` iff the object exists with a different or missing digest
pub fn decide(record: &LocalFileRecord, remote: Option<&RemoteObject>) -> SyncDecision {
    let decision = match remote {
        None => SyncDecision::Create,
        Some(object) => match object.digest.as_deref() {
            Some(stored) if stored == record.digest.as_str() => SyncDecision::Skip,
            _ => SyncDecision::Replace,
        },
    };

    trace!(
        key = %record.key,
        local = %record.digest,
        remote = ?remote.and_then(|o| o.digest.as_deref()),
        %decision,
        "Sync decision"
    );

    decision
}

/// Read-only lookup of the remote state of logical keys in one bucket
pub struct RemoteStateReader {
    store: Arc<dyn IObjectStore>,
    bucket: BucketName,
}

impl RemoteStateReader {
    /// Creates a reader for `bucket`
    pub fn new(store: Arc<dyn IObjectStore>, bucket: BucketName) -> Self {
        Self { store, bucket }
    }

    /// Bucket this reader queries
    pub fn bucket(&self) -> &BucketName {
        &self.bucket
    }

    /// Returns the object stored under `key`, or `None` if absent
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried
    pub async fn lookup(&self, key: &LogicalKey) -> Result<Option<RemoteObject>> {
        self.store
            .head_object(&self.bucket, key)
            .await
            .with_context(|| format!("Failed to look up s3://{}/{}", self.bucket, key))
    }
}
