//! Domain entities and business logic
//!
//! This module contains the core domain types for s3putsecure:
//! - Newtypes for validated values (source root, logical key, digest, bucket)
//! - Records flowing through a run (local file, remote object, transfer job)
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod record;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::*;
pub use record::{
    EncryptionMode, LocalFileRecord, ProgressSnapshot, RemoteObject, SyncDecision, TransferJob,
};
