//! Sync observer port (driven/secondary port)
//!
//! The sync engine reports what it decides and does through this trait and
//! never writes to the console itself. The CLI implements it with human or
//! JSON output and a progress bar; tests use [`NoopObserver`] or a recording
//! fake.
//!
//! All methods have empty default implementations so observers only
//! override what they display.

use std::path::Path;

use crate::domain::newtypes::{BucketName, SourceRoot};
use crate::domain::record::{
    LocalFileRecord, ProgressSnapshot, RemoteObject, SyncDecision, TransferJob,
};

/// Receives events from a sync run
pub trait ISyncObserver: Send + Sync {
    /// The walk is about to start
    fn run_started(&self, _root: &SourceRoot, _bucket: &BucketName, _simulate: bool) {}

    /// A path matched an exclude pattern and will not be processed
    fn file_excluded(&self, _path: &Path, _pattern: &str) {}

    /// A file has been classified
    fn file_decided(
        &self,
        _record: &LocalFileRecord,
        _remote: Option<&RemoteObject>,
        _decision: SyncDecision,
    ) {
    }

    /// Encryption of a job is starting
    fn encryption_started(&self, _job: &TransferJob, _description: &str) {}

    /// The upload of a job is starting
    fn upload_started(&self, _job: &TransferJob, _total_bytes: u64) {}

    /// Periodic progress of the current upload
    fn upload_progress(&self, _snapshot: &ProgressSnapshot) {}

    /// The upload of a job completed
    fn upload_finished(&self, _job: &TransferJob, _bytes: u64) {}

    /// A file could not be processed; the run continues
    fn file_failed(&self, _path: &Path, _error: &str) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ISyncObserver for NoopObserver {}
