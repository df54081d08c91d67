//! Shared fakes for sync engine integration tests
//!
//! - [`MemoryStore`] keeps objects in a map and counts calls
//! - [`FakeEncryptor`] wraps content in `ENC[...]` and records staging paths
//! - [`RecordingObserver`] captures decisions and progress

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use s3putsecure_core::domain::newtypes::{BucketName, LogicalKey, SourceRoot};
use s3putsecure_core::domain::record::{
    EncryptionMode, LocalFileRecord, ProgressSnapshot, RemoteObject, SyncDecision, TransferJob,
};
use s3putsecure_core::ports::{
    EncryptionError, IEncryptionProvider, IObjectStore, ISyncObserver, ProgressFn, StoreError,
    UploadRequest,
};
use s3putsecure_sync::retry::RetryPolicy;
use s3putsecure_sync::{SyncEngine, SyncOptions};

pub const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";
pub const WORLD_MD5: &str = "7d793037a0760186574b0282f2f435e7";

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub digest: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    bucket_missing: Mutex<bool>,
    pub head_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    /// Upload sources that existed when the upload ran
    pub uploaded_from: Mutex<Vec<PathBuf>>,
    /// Number of upcoming puts that fail with a transient error
    pub transient_put_failures: AtomicU32,
    /// Every put fails with a permanent error
    pub reject_puts: Mutex<bool>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn without_bucket() -> Arc<Self> {
        let store = Self::default();
        *store.bucket_missing.lock().unwrap() = true;
        Arc::new(store)
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Seeds an object as if a previous run (or another tool) wrote it
    pub fn insert(&self, key: &str, content: &[u8], digest: Option<&str>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content: content.to_vec(),
                digest: digest.map(str::to_string),
            },
        );
    }

    pub fn puts(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IObjectStore for MemoryStore {
    async fn bucket_exists(&self, _bucket: &BucketName) -> anyhow::Result<bool> {
        Ok(!*self.bucket_missing.lock().unwrap())
    }

    async fn create_bucket(&self, _bucket: &BucketName) -> anyhow::Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.bucket_missing.lock().unwrap() = false;
        Ok(())
    }

    async fn head_object(
        &self,
        bucket: &BucketName,
        key: &LogicalKey,
    ) -> anyhow::Result<Option<RemoteObject>> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        if *self.bucket_missing.lock().unwrap() {
            return Err(StoreError::BucketNotFound(bucket.to_string()).into());
        }
        Ok(self.object(key.as_str()).map(|o| RemoteObject {
            key: key.clone(),
            digest: o.digest,
            etag: None,
            size: Some(o.content.len() as u64),
        }))
    }

    async fn put_object(
        &self,
        request: &UploadRequest,
        progress: ProgressFn<'_>,
    ) -> anyhow::Result<u64> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        if *self.reject_puts.lock().unwrap() {
            return Err(StoreError::Rejected("AccessDenied".into()).into());
        }
        let pending = self.transient_put_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.transient_put_failures.store(pending - 1, Ordering::SeqCst);
            return Err(StoreError::Transient("503 Slow Down".into()).into());
        }

        let content = tokio::fs::read(&request.source)
            .await
            .map_err(|source| StoreError::Source {
                path: request.source.clone(),
                source,
            })?;
        self.uploaded_from.lock().unwrap().push(request.source.clone());

        let total = content.len() as u64;
        progress(0, total);
        progress(total / 2, total);
        progress(total, total);

        self.insert(request.key.as_str(), &content, Some(request.digest.as_str()));
        Ok(total)
    }
}

// ============================================================================
// FakeEncryptor
// ============================================================================

#[derive(Default)]
pub struct FakeEncryptor {
    pub calls: AtomicUsize,
    pub staging_paths: Mutex<Vec<PathBuf>>,
    /// Write a partial file then fail
    pub fail: bool,
}

#[allow(dead_code)]
impl FakeEncryptor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn encryptions(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        self.staging_paths.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IEncryptionProvider for FakeEncryptor {
    fn describe(&self) -> String {
        "fake".to_string()
    }

    async fn encrypt(&self, source: &Path, staging: &Path) -> Result<(), EncryptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.staging_paths.lock().unwrap().push(staging.to_path_buf());

        if self.fail {
            std::fs::write(staging, b"ENC[trunc").map_err(|e| EncryptionError::Io {
                path: source.to_path_buf(),
                source: e,
            })?;
            return Err(EncryptionError::Failed {
                path: source.to_path_buf(),
                status: "exit status: 2".to_string(),
                stderr: "public key not found".to_string(),
            });
        }

        let plain = std::fs::read(source).map_err(|e| EncryptionError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        let mut cipher = b"ENC[".to_vec();
        cipher.extend_from_slice(&plain);
        cipher.push(b']');
        std::fs::write(staging, cipher).map_err(|e| EncryptionError::Io {
            path: source.to_path_buf(),
            source: e,
        })
    }
}

// ============================================================================
// RecordingObserver
// ============================================================================

#[derive(Default)]
pub struct RecordingObserver {
    pub decisions: Mutex<Vec<(String, SyncDecision)>>,
    pub excluded: Mutex<Vec<PathBuf>>,
    pub failed: Mutex<Vec<PathBuf>>,
    pub progress: Mutex<Vec<ProgressSnapshot>>,
    pub finished: Mutex<Vec<(String, u64)>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn decisions(&self) -> Vec<(String, SyncDecision)> {
        self.decisions.lock().unwrap().clone()
    }

    pub fn decision_for(&self, key: &str) -> Option<SyncDecision> {
        self.decisions()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, d)| d)
    }
}

impl ISyncObserver for RecordingObserver {
    fn file_excluded(&self, path: &Path, _pattern: &str) {
        self.excluded.lock().unwrap().push(path.to_path_buf());
    }

    fn file_decided(
        &self,
        record: &LocalFileRecord,
        _remote: Option<&RemoteObject>,
        decision: SyncDecision,
    ) {
        self.decisions
            .lock()
            .unwrap()
            .push((record.key.to_string(), decision));
    }

    fn upload_progress(&self, snapshot: &ProgressSnapshot) {
        self.progress.lock().unwrap().push(snapshot.clone());
    }

    fn upload_finished(&self, job: &TransferJob, bytes: u64) {
        self.finished
            .lock()
            .unwrap()
            .push((job.key.to_string(), bytes));
    }

    fn file_failed(&self, path: &Path, _error: &str) {
        self.failed.lock().unwrap().push(path.to_path_buf());
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Creates a temporary source tree with the given relative files
pub fn source_tree(files: &[(&str, &[u8])]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for (rel, content) in files {
        write_file(dir.path(), rel, content);
    }
    dir
}

pub fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn root_of(dir: &TempDir) -> SourceRoot {
    SourceRoot::new(dir.path().to_path_buf()).unwrap()
}

pub fn bucket() -> BucketName {
    BucketName::new("backups".to_string()).unwrap()
}

/// Options with fast retries so failure tests do not sleep for seconds
pub fn options() -> SyncOptions {
    let mut options = SyncOptions::new(bucket());
    options.retry = RetryPolicy::new(3).with_base_delay(Duration::from_millis(1));
    options
}

pub fn encrypting_options() -> SyncOptions {
    let mut options = options();
    options.mode = EncryptionMode::Asymmetric {
        recipient: "alice@example.com".to_string(),
    };
    options
}

/// Plaintext engine reporting to `observer`
pub fn plain_engine(
    store: &Arc<MemoryStore>,
    observer: &Arc<RecordingObserver>,
    options: SyncOptions,
) -> SyncEngine {
    let mut engine = SyncEngine::new(store.clone(), options).expect("engine");
    engine.set_observer(observer.clone());
    engine
}

/// Encrypting engine reporting to `observer`
pub fn encrypting_engine(
    store: &Arc<MemoryStore>,
    encryptor: &Arc<FakeEncryptor>,
    observer: &Arc<RecordingObserver>,
    options: SyncOptions,
) -> SyncEngine {
    let mut engine =
        SyncEngine::with_encryptor(store.clone(), encryptor.clone(), options).expect("engine");
    engine.set_observer(observer.clone());
    engine
}
