//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! logical key derivation, digest validation and path handling.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path is not located below the source root
    #[error("Path not within source root: {0}")]
    PathNotInSourceRoot(String),

    /// Logical key is empty or contains components that cannot be represented
    #[error("Invalid logical key: {0}")]
    InvalidKey(String),

    /// Invalid digest format (expected 32 lowercase hex characters)
    #[error("Invalid digest format: {0}")]
    InvalidDigest(String),

    /// Bucket name does not follow the object store naming rules
    #[error("Invalid bucket name: {0}")]
    InvalidBucket(String),
}
