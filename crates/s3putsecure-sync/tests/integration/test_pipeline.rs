//! Encrypt-and-upload pipeline: ciphertext upload, staging cleanup,
//! retries and progress

use std::sync::atomic::Ordering;

use s3putsecure_core::domain::record::EncryptionMode;
use s3putsecure_core::ports::EncryptionError;
use s3putsecure_sync::{SyncEngine, SyncError};
use tempfile::TempDir;

use crate::common::*;

#[tokio::test]
async fn test_ciphertext_uploaded_with_plaintext_digest() {
    let dir = source_tree(&[("a.txt", b"hello")]);
    let store = MemoryStore::new();
    let encryptor = FakeEncryptor::new();
    let observer = RecordingObserver::new();
    let engine = encrypting_engine(&store, &encryptor, &observer, encrypting_options());

    let result = engine.run(&root_of(&dir)).await.unwrap();
    assert_eq!(result.files_created, 1);
    assert_eq!(result.bytes_uploaded, b"ENC[hello]".len() as u64);

    let object = store.object("a.txt").unwrap();
    assert_eq!(object.content, b"ENC[hello]");
    assert_eq!(object.digest.as_deref(), Some(HELLO_MD5));

    // The upload read the staging file, not the source
    let uploaded = store.uploaded_from.lock().unwrap().clone();
    assert_eq!(uploaded, encryptor.staged());
    assert_ne!(uploaded[0], dir.path().join("a.txt"));
}

#[tokio::test]
async fn test_encrypted_run_is_idempotent() {
    let dir = source_tree(&[("a.txt", b"hello"), ("b.txt", b"world")]);
    let store = MemoryStore::new();
    let encryptor = FakeEncryptor::new();
    let observer = RecordingObserver::new();
    let engine = encrypting_engine(&store, &encryptor, &observer, encrypting_options());
    let root = root_of(&dir);

    engine.run(&root).await.unwrap();
    let second = engine.run(&root).await.unwrap();

    assert_eq!(second.files_skipped, 2);
    assert_eq!(encryptor.encryptions(), 2);
    assert_eq!(store.puts(), 2);
}

#[tokio::test]
async fn test_staging_files_removed_after_success() {
    let dir = source_tree(&[("x/notes.txt", b"one"), ("y/notes.txt", b"two")]);
    let staging_parent = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let encryptor = FakeEncryptor::new();
    let observer = RecordingObserver::new();
    let mut opts = encrypting_options();
    opts.staging_dir = Some(staging_parent.path().to_path_buf());
    let engine = encrypting_engine(&store, &encryptor, &observer, opts);

    engine.run(&root_of(&dir)).await.unwrap();

    let staged = encryptor.staged();
    assert_eq!(staged.len(), 2);
    assert_ne!(staged[0], staged[1]);
    for path in &staged {
        assert!(path.starts_with(staging_parent.path()));
        assert!(!path.exists(), "staging file left behind: {}", path.display());
    }
    assert_eq!(store.object("x/notes.txt").unwrap().content, b"ENC[one]");
    assert_eq!(store.object("y/notes.txt").unwrap().content, b"ENC[two]");

    // The per-run staging directory is gone too
    assert_eq!(std::fs::read_dir(staging_parent.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_encryption_failure_aborts_without_upload() {
    let dir = source_tree(&[("a.txt", b"hello"), ("b.txt", b"world")]);
    let store = MemoryStore::new();
    let encryptor = FakeEncryptor::failing();
    let observer = RecordingObserver::new();
    let engine = encrypting_engine(&store, &encryptor, &observer, encrypting_options());

    let err = engine.run(&root_of(&dir)).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SyncError>(),
        Some(SyncError::Encryption(EncryptionError::Failed { .. }))
    ));
    assert!(format!("{err:#}").contains("public key not found"));

    // Fatal: stops at the first file, nothing uploaded, no fallback to plaintext
    assert_eq!(encryptor.encryptions(), 1);
    assert_eq!(store.puts(), 0);
    assert!(store.keys().is_empty());

    // The partial ciphertext was cleaned up
    for path in encryptor.staged() {
        assert!(!path.exists());
    }
}

#[tokio::test]
async fn test_transient_upload_failure_is_retried_without_reencrypting() {
    let dir = source_tree(&[("a.txt", b"hello")]);
    let store = MemoryStore::new();
    store.transient_put_failures.store(2, Ordering::SeqCst);
    let encryptor = FakeEncryptor::new();
    let observer = RecordingObserver::new();
    let engine = encrypting_engine(&store, &encryptor, &observer, encrypting_options());

    let result = engine.run(&root_of(&dir)).await.unwrap();
    assert_eq!(result.files_created, 1);
    assert_eq!(store.puts(), 3);
    assert_eq!(encryptor.encryptions(), 1);
    assert_eq!(store.object("a.txt").unwrap().content, b"ENC[hello]");
}

#[tokio::test]
async fn test_exhausted_retries_abort_the_run() {
    let dir = source_tree(&[("a.txt", b"hello")]);
    let store = MemoryStore::new();
    store.transient_put_failures.store(10, Ordering::SeqCst);
    let observer = RecordingObserver::new();
    let engine = plain_engine(&store, &observer, options());

    let err = engine.run(&root_of(&dir)).await.unwrap_err();
    assert!(format!("{err:#}").contains("s3://backups/a.txt"));
    // One attempt plus three retries
    assert_eq!(store.puts(), 4);
}

#[tokio::test]
async fn test_rejected_upload_is_not_retried() {
    let dir = source_tree(&[("a.txt", b"hello")]);
    let store = MemoryStore::new();
    *store.reject_puts.lock().unwrap() = true;
    let observer = RecordingObserver::new();
    let engine = plain_engine(&store, &observer, options());

    let err = engine.run(&root_of(&dir)).await.unwrap_err();
    assert!(format!("{err:#}").contains("AccessDenied"));
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn test_plaintext_upload_reads_source_directly() {
    let dir = source_tree(&[("a.txt", b"hello")]);
    let store = MemoryStore::new();
    let observer = RecordingObserver::new();
    let engine = plain_engine(&store, &observer, options());

    engine.run(&root_of(&dir)).await.unwrap();
    assert_eq!(store.object("a.txt").unwrap().content, b"hello");
    assert_eq!(
        store.uploaded_from.lock().unwrap().clone(),
        vec![dir.path().join("a.txt")]
    );
    // Plaintext source is never deleted
    assert!(dir.path().join("a.txt").exists());
}

#[tokio::test]
async fn test_progress_snapshots_reach_observer() {
    let dir = source_tree(&[("a.txt", b"hello world")]);
    let store = MemoryStore::new();
    let observer = RecordingObserver::new();
    let engine = plain_engine(&store, &observer, options());

    engine.run(&root_of(&dir)).await.unwrap();

    let progress = observer.progress.lock().unwrap().clone();
    assert_eq!(progress.len(), 3);
    assert!(progress.iter().all(|s| s.key.as_str() == "a.txt"));
    assert_eq!(progress[0].percent, 0);
    assert_eq!(progress[2].percent, 100);
    assert_eq!(progress[2].bytes_done, 11);
    assert_eq!(
        observer.finished.lock().unwrap().clone(),
        vec![("a.txt".to_string(), 11)]
    );
}

#[tokio::test]
async fn test_zero_byte_file_is_uploaded() {
    let dir = source_tree(&[("empty", b"")]);
    let store = MemoryStore::new();
    let observer = RecordingObserver::new();
    let engine = plain_engine(&store, &observer, options());

    let result = engine.run(&root_of(&dir)).await.unwrap();
    assert_eq!(result.files_created, 1);
    assert_eq!(
        store.object("empty").unwrap().digest.as_deref(),
        Some("d41d8cd98f00b204e9800998ecf8427e")
    );
    let progress = observer.progress.lock().unwrap().clone();
    assert!(progress.iter().all(|s| s.percent == 100));
}

#[test]
fn test_encrypting_mode_requires_provider() {
    let store = MemoryStore::new();
    let mut opts = options();
    opts.mode = EncryptionMode::Asymmetric {
        recipient: "alice".to_string(),
    };
    let err = SyncEngine::new(store, opts).err().unwrap();
    assert!(matches!(err, SyncError::MissingEncryptor(_)));
}
