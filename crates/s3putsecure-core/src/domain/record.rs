//! Records flowing through a sync run
//!
//! A run creates one [`LocalFileRecord`] per discovered file, pairs it with
//! the [`RemoteObject`] found under the same key (if any), classifies the
//! pair as a [`SyncDecision`], and creates a [`TransferJob`] for every
//! decision that requires an upload.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::newtypes::{ContentDigest, LogicalKey, Passphrase};

/// A regular file found under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileRecord {
    /// Path as constructed during the walk (root joined with the entry names)
    pub path: PathBuf,
    /// Key of the file in the remote store
    pub key: LogicalKey,
    /// Fingerprint of the unencrypted content
    pub digest: ContentDigest,
    /// Size of the plaintext in bytes
    pub size: u64,
}

/// An object that already exists in the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Key of the object
    pub key: LogicalKey,
    /// Plaintext digest stored as custom metadata when this tool wrote the
    /// object; `None` for objects written by something else
    pub digest: Option<String>,
    /// Checksum of the stored (possibly encrypted) bytes, as reported by the
    /// store. Informational only: it never participates in decisions.
    pub etag: Option<String>,
    /// Size of the stored bytes
    pub size: Option<u64>,
}

impl RemoteObject {
    /// Creates a remote object record with only a key and stored digest
    pub fn new(key: LogicalKey, digest: Option<String>) -> Self {
        Self {
            key,
            digest,
            etag: None,
            size: None,
        }
    }
}

/// Classification of a local file against the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    /// Remote object exists and its stored digest equals the local digest
    Skip,
    /// No remote object exists under the key
    Create,
    /// A remote object exists but its stored digest differs or is missing
    Replace,
}

impl SyncDecision {
    /// Returns true if the decision requires content to be uploaded
    pub fn needs_transfer(&self) -> bool {
        !matches!(self, SyncDecision::Skip)
    }
}

impl Display for SyncDecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncDecision::Skip => "skip",
            SyncDecision::Create => "create",
            SyncDecision::Replace => "replace",
        };
        write!(f, "{}", s)
    }
}

/// How file content is protected before upload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EncryptionMode {
    /// Upload the plaintext as-is
    #[default]
    None,
    /// Encrypt for the public key of a named recipient
    Asymmetric {
        /// Key id, fingerprint or user id understood by the encryption tool
        recipient: String,
    },
    /// Encrypt with a passphrase-derived key
    Symmetric {
        /// Passphrase supplied on the command line or environment
        passphrase: Passphrase,
    },
}

impl EncryptionMode {
    /// Returns true if content is encrypted before upload
    pub fn is_enabled(&self) -> bool {
        !matches!(self, EncryptionMode::None)
    }
}

impl Display for EncryptionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionMode::None => write!(f, "none"),
            EncryptionMode::Asymmetric { recipient } => write!(f, "public-key for {recipient}"),
            EncryptionMode::Symmetric { .. } => write!(f, "symmetric"),
        }
    }
}

/// Work item for a file that must be uploaded
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// Key the content is written under
    pub key: LogicalKey,
    /// Plaintext file on disk
    pub source: PathBuf,
    /// Ciphertext location; `None` when the source is uploaded directly
    pub staging: Option<PathBuf>,
    /// Digest recorded as the object's metadata
    pub digest: ContentDigest,
    /// Whether the object is created or overwritten
    pub decision: SyncDecision,
    /// Encryption applied to the content
    pub mode: EncryptionMode,
}

impl TransferJob {
    /// Creates a job for `record` with no staging file yet
    pub fn new(record: &LocalFileRecord, decision: SyncDecision, mode: EncryptionMode) -> Self {
        Self {
            key: record.key.clone(),
            source: record.path.clone(),
            staging: None,
            digest: record.digest.clone(),
            decision,
            mode,
        }
    }

    /// The file whose bytes are sent: the staging file if present,
    /// otherwise the source itself
    pub fn upload_path(&self) -> &PathBuf {
        self.staging.as_ref().unwrap_or(&self.source)
    }
}

/// A single progress sample for an upload in flight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Key being uploaded
    pub key: LogicalKey,
    /// Bytes sent so far
    pub bytes_done: u64,
    /// Total bytes to send
    pub total_bytes: u64,
    /// Completion in percent (0-100)
    pub percent: u8,
    /// Rolling transfer rate in bytes per second
    pub rate_bytes_per_sec: f64,
}
