//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IObjectStore`] - Bucket and object operations (S3)
//! - [`IEncryptionProvider`] - Plaintext to ciphertext (GnuPG)
//! - [`ISyncObserver`] - Decisions and progress reporting (console)

pub mod encryption;
pub mod object_store;
pub mod observer;

pub use encryption::{EncryptionError, IEncryptionProvider};
pub use object_store::{
    IObjectStore, ProgressFn, StoreError, UploadRequest, DEFAULT_DIGEST_METADATA_KEY,
};
pub use observer::{ISyncObserver, NoopObserver};
