//! Sync engine
//!
//! The [`SyncEngine`] mirrors a local directory tree into a bucket, one way.
//!
//! ## Sync Flow
//!
//! 1. **Bucket**: check the bucket exists, creating it when requested
//! 2. **Walk**: enumerate regular files under the source root
//! 3. **Per file**: exclude → digest → remote lookup → decide
//! 4. **Pipeline** (Create/Replace, not simulated): encrypt into the staging
//!    area if enabled, upload with the digest as metadata, remove the
//!    staging file
//!
//! Files are processed strictly one after another. A file that vanishes or
//! cannot be read is recorded in [`SyncResult::errors`] and skipped; encryption
//! failures, store failures after retries and unreadable directories abort
//! the run.
//!
//! ## Retry Logic
//!
//! Transient store errors are retried with exponential backoff (see
//! [`crate::retry`]). Uploads retry with the same staging file; encryption
//! is never re-run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use s3putsecure_core::domain::newtypes::{BucketName, LogicalKey, SourceRoot};
use s3putsecure_core::domain::record::{
    EncryptionMode, LocalFileRecord, RemoteObject, SyncDecision, TransferJob,
};
use s3putsecure_core::ports::{
    IEncryptionProvider, IObjectStore, ISyncObserver, NoopObserver, UploadRequest,
};
use s3putsecure_core::usecases::{decide, RemoteStateReader};

use crate::digest::compute_digest;
use crate::exclude::ExclusionFilter;
use crate::progress::TransferRate;
use crate::retry::RetryPolicy;
use crate::staging::StagingArea;
use crate::SyncError;

// ============================================================================
// SyncResult
// ============================================================================

/// Summary of a completed sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    /// Objects written that did not exist before
    pub files_created: u32,
    /// Objects overwritten because the content changed
    pub files_replaced: u32,
    /// Files whose stored digest matched
    pub files_skipped: u32,
    /// Files matching an exclude pattern
    pub files_excluded: u32,
    /// Bytes sent to the store (ciphertext size when encrypting)
    pub bytes_uploaded: u64,
    /// Per-file errors that did not abort the run
    pub errors: Vec<String>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    /// Decisions only; nothing was written
    pub simulated: bool,
}

impl SyncResult {
    fn new(simulated: bool) -> Self {
        Self {
            files_created: 0,
            files_replaced: 0,
            files_skipped: 0,
            files_excluded: 0,
            bytes_uploaded: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
            simulated,
        }
    }

    /// Created plus replaced (or that would be, when simulated)
    pub fn files_transferred(&self) -> u32 {
        self.files_created + self.files_replaced
    }

    /// Nothing needed uploading and nothing failed
    pub fn is_up_to_date(&self) -> bool {
        self.files_transferred() == 0 && self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ============================================================================
// Options
// ============================================================================

/// Per-run settings
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Target bucket
    pub bucket: BucketName,
    /// Decide and report only
    pub simulate: bool,
    /// Create the bucket when it does not exist
    pub create_bucket: bool,
    /// Content protection applied before upload
    pub mode: EncryptionMode,
    /// Backoff for transient store errors
    pub retry: RetryPolicy,
    /// Parent of the staging directory; system temp dir when `None`
    pub staging_dir: Option<PathBuf>,
}

impl SyncOptions {
    pub fn new(bucket: BucketName) -> Self {
        Self {
            bucket,
            simulate: false,
            create_bucket: false,
            mode: EncryptionMode::None,
            retry: RetryPolicy::default(),
            staging_dir: None,
        }
    }
}

/// Outcome of the bucket check at the start of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketStatus {
    /// The bucket was already there
    Existing,
    /// The bucket was created for this run
    Created,
    /// Simulation: the bucket is missing and would be created
    WouldCreate,
}

// ============================================================================
// SyncEngine
// ============================================================================

/// State threaded through one walk
struct RunContext<'a> {
    root: &'a SourceRoot,
    staging: Option<StagingArea>,
    /// The bucket does not exist yet (simulated creation); every key is absent
    bucket_absent: bool,
    result: SyncResult,
}

/// One-way mirror of a directory tree into a bucket
pub struct SyncEngine {
    store: Arc<dyn IObjectStore>,
    reader: RemoteStateReader,
    encryptor: Option<Arc<dyn IEncryptionProvider>>,
    filter: ExclusionFilter,
    observer: Arc<dyn ISyncObserver>,
    options: SyncOptions,
}

impl SyncEngine {
    /// Creates an engine that uploads without exclusions or observer
    ///
    /// # Errors
    /// [`SyncError::MissingEncryptor`] if `options.mode` enables encryption;
    /// use [`SyncEngine::with_encryptor`] for that.
    pub fn new(store: Arc<dyn IObjectStore>, options: SyncOptions) -> Result<Self, SyncError> {
        Self::build(store, None, options)
    }

    /// Creates an engine that encrypts with `encryptor` when `options.mode`
    /// enables encryption
    pub fn with_encryptor(
        store: Arc<dyn IObjectStore>,
        encryptor: Arc<dyn IEncryptionProvider>,
        options: SyncOptions,
    ) -> Result<Self, SyncError> {
        Self::build(store, Some(encryptor), options)
    }

    fn build(
        store: Arc<dyn IObjectStore>,
        encryptor: Option<Arc<dyn IEncryptionProvider>>,
        options: SyncOptions,
    ) -> Result<Self, SyncError> {
        let encryptor = if options.mode.is_enabled() {
            Some(encryptor.ok_or_else(|| SyncError::MissingEncryptor(options.mode.to_string()))?)
        } else {
            None
        };
        let reader = RemoteStateReader::new(Arc::clone(&store), options.bucket.clone());

        Ok(Self {
            store,
            reader,
            encryptor,
            filter: ExclusionFilter::empty(),
            observer: Arc::new(NoopObserver),
            options,
        })
    }

    /// Skip files matching `filter`
    pub fn set_exclusions(&mut self, filter: ExclusionFilter) {
        self.filter = filter;
    }

    /// Report events to `observer`
    pub fn set_observer(&mut self, observer: Arc<dyn ISyncObserver>) {
        self.observer = observer;
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    // ========================================================================
    // Bucket
    // ========================================================================

    /// Makes sure the target bucket exists
    ///
    /// In simulation mode a missing bucket is reported as
    /// [`BucketStatus::WouldCreate`] and not created.
    ///
    /// # Errors
    /// [`SyncError::BucketNotFound`] if the bucket is missing and creation
    /// was not requested, or the store error.
    #[tracing::instrument(skip(self), fields(bucket = %self.options.bucket))]
    pub async fn ensure_bucket(&self) -> Result<BucketStatus> {
        let bucket = &self.options.bucket;
        let exists = self
            .options
            .retry
            .run("bucket_exists", || self.store.bucket_exists(bucket))
            .await
            .with_context(|| format!("Failed to open bucket {bucket}"))?;

        if exists {
            return Ok(BucketStatus::Existing);
        }
        if !self.options.create_bucket {
            return Err(SyncError::BucketNotFound(bucket.to_string()).into());
        }
        if self.options.simulate {
            info!("Bucket missing, would be created");
            return Ok(BucketStatus::WouldCreate);
        }

        info!("Creating bucket");
        self.options
            .retry
            .run("create_bucket", || self.store.create_bucket(bucket))
            .await
            .with_context(|| format!("Failed to create bucket {bucket}"))?;
        Ok(BucketStatus::Created)
    }

    // ========================================================================
    // Run
    // ========================================================================

    /// Fails with [`SyncError::SourceNotFound`] unless `root` is a directory
    pub async fn check_source(root: &SourceRoot) -> Result<()> {
        let is_dir = tokio::fs::metadata(root.as_path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(SyncError::SourceNotFound(root.as_path().to_path_buf()).into());
        }
        Ok(())
    }

    /// Checks the source and the bucket, then mirrors `root` into it
    ///
    /// The source is checked first so a mistyped path never touches the
    /// store.
    pub async fn run(&self, root: &SourceRoot) -> Result<SyncResult> {
        Self::check_source(root).await?;
        let status = self.ensure_bucket().await?;
        self.sync(root, status).await
    }

    /// Mirrors `root` into the bucket
    ///
    /// `status` is the outcome of [`SyncEngine::ensure_bucket`].
    #[tracing::instrument(skip(self, root), fields(root = %root, bucket = %self.options.bucket))]
    pub async fn sync(&self, root: &SourceRoot, status: BucketStatus) -> Result<SyncResult> {
        let start = Instant::now();
        let simulate = self.options.simulate;

        Self::check_source(root).await?;

        let staging = if self.encryptor.is_some() && !simulate {
            let area = StagingArea::create(self.options.staging_dir.as_deref())
                .map_err(SyncError::from)
                .context("Failed to create staging directory")?;
            Some(area)
        } else {
            None
        };

        info!(simulate, mode = %self.options.mode, "Starting sync");
        self.observer.run_started(root, &self.options.bucket, simulate);

        let mut ctx = RunContext {
            root,
            staging,
            bucket_absent: status == BucketStatus::WouldCreate,
            result: SyncResult::new(simulate),
        };

        self.walk_directory(root.as_path(), &mut ctx).await?;

        let mut result = ctx.result;
        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            created = result.files_created,
            replaced = result.files_replaced,
            skipped = result.files_skipped,
            excluded = result.files_excluded,
            bytes = result.bytes_uploaded,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "Sync complete"
        );

        Ok(result)
    }

    /// Recursively walks a directory, processing every regular file
    ///
    /// Entries are visited in name order. Symlinks to files are followed;
    /// symlinks to directories are not descended.
    fn walk_directory<'a>(
        &'a self,
        dir: &'a Path,
        ctx: &'a mut RunContext<'_>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(dir)
                .await
                .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

            let mut children = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            {
                children.push(entry);
            }
            children.sort_by_key(|e| e.file_name());

            for entry in children {
                let path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(err) => {
                        self.record_failure(&path, &err.to_string(), &mut ctx.result);
                        continue;
                    }
                };

                if file_type.is_dir() {
                    self.walk_directory(&path, ctx).await?;
                } else if file_type.is_file() {
                    self.process_file(&path, ctx).await?;
                } else if file_type.is_symlink() {
                    match tokio::fs::metadata(&path).await {
                        Ok(meta) if meta.is_file() => self.process_file(&path, ctx).await?,
                        Ok(_) => debug!(path = %path.display(), "Not following directory symlink"),
                        Err(err) => {
                            // Dangling link
                            self.record_failure(&path, &err.to_string(), &mut ctx.result)
                        }
                    }
                } else {
                    debug!(path = %path.display(), "Skipping special file");
                }
            }

            Ok(())
        })
    }

    /// Runs one file through exclude, digest, lookup, decide and pipeline
    async fn process_file(&self, path: &Path, ctx: &mut RunContext<'_>) -> Result<()> {
        if let Some(pattern) = self.filter.matching_pattern(path) {
            debug!(path = %path.display(), pattern, "Excluded");
            self.observer.file_excluded(path, pattern);
            ctx.result.files_excluded += 1;
            return Ok(());
        }

        let key = match LogicalKey::from_paths(ctx.root, path) {
            Ok(key) => key,
            Err(err) => {
                self.record_failure(path, &err.to_string(), &mut ctx.result);
                return Ok(());
            }
        };

        let file_digest = match compute_digest(path).await {
            Ok(d) => d,
            Err(err) => {
                self.record_failure(path, &format!("cannot read file: {err}"), &mut ctx.result);
                return Ok(());
            }
        };

        let record = LocalFileRecord {
            path: path.to_path_buf(),
            key,
            digest: file_digest.digest,
            size: file_digest.size,
        };

        let remote = self.lookup(&record.key, ctx.bucket_absent).await?;
        let decision = decide(&record, remote.as_ref());
        self.observer.file_decided(&record, remote.as_ref(), decision);

        match decision {
            SyncDecision::Skip => {
                ctx.result.files_skipped += 1;
                return Ok(());
            }
            SyncDecision::Create => ctx.result.files_created += 1,
            SyncDecision::Replace => ctx.result.files_replaced += 1,
        }

        if self.options.simulate {
            debug!(key = %record.key, %decision, "Simulation, not uploading");
            return Ok(());
        }

        let job = TransferJob::new(&record, decision, self.options.mode.clone());
        let bytes = self.transfer(job, ctx.staging.as_ref()).await?;
        ctx.result.bytes_uploaded += bytes;
        Ok(())
    }

    async fn lookup(&self, key: &LogicalKey, bucket_absent: bool) -> Result<Option<RemoteObject>> {
        if bucket_absent {
            return Ok(None);
        }
        self.options
            .retry
            .run("head_object", || self.reader.lookup(key))
            .await
    }

    // ========================================================================
    // Encrypt-and-upload pipeline
    // ========================================================================

    /// Encrypts (if enabled) and uploads one job; returns bytes uploaded
    ///
    /// The staging file is removed when this returns, whatever the outcome.
    #[tracing::instrument(skip(self, job, staging), fields(key = %job.key, decision = %job.decision))]
    async fn transfer(&self, mut job: TransferJob, staging: Option<&StagingArea>) -> Result<u64> {
        let _staged = match (&self.encryptor, staging) {
            (Some(encryptor), Some(area)) => {
                let staged = area.stage(&job.key);
                self.observer.encryption_started(&job, &encryptor.describe());
                encryptor
                    .encrypt(&job.source, staged.path())
                    .await
                    .map_err(SyncError::from)
                    .with_context(|| format!("Failed to encrypt {}", job.source.display()))?;
                job.staging = Some(staged.path().to_path_buf());
                Some(staged)
            }
            _ => None,
        };

        self.upload(&job).await
    }

    async fn upload(&self, job: &TransferJob) -> Result<u64> {
        let upload_path = job.upload_path().clone();
        let total_bytes = tokio::fs::metadata(&upload_path)
            .await
            .with_context(|| format!("Failed to stat {}", upload_path.display()))?
            .len();

        let request = UploadRequest {
            bucket: self.options.bucket.clone(),
            key: job.key.clone(),
            source: upload_path,
            digest: job.digest.clone(),
        };

        info!(key = %job.key, total_bytes, "Uploading");
        self.observer.upload_started(job, total_bytes);

        let mut attempt = 0;
        let bytes = loop {
            let mut rate = TransferRate::new(job.key.clone());
            let observer = &self.observer;
            let mut on_progress = |done: u64, total: u64| {
                observer.upload_progress(&rate.sample(done, total));
            };

            let err = match self.store.put_object(&request, &mut on_progress).await {
                Ok(bytes) => break bytes,
                Err(err) => err,
            };
            match self.options.retry.delay_for(attempt, &err) {
                Some(delay) => {
                    self.options
                        .retry
                        .log_retry("put_object", attempt, delay, &err);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    return Err(err).with_context(|| {
                        format!("Failed to upload s3://{}/{}", request.bucket, request.key)
                    })
                }
            }
        };

        self.observer.upload_finished(job, bytes);
        Ok(bytes)
    }

    fn record_failure(&self, path: &Path, error: &str, result: &mut SyncResult) {
        warn!(path = %path.display(), error, "Skipping file");
        self.observer.file_failed(path, error);
        result.errors.push(format!("{}: {}", path.display(), error));
    }
}
