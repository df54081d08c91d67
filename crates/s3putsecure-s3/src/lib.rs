//! s3putsecure S3 - Amazon S3 object store adapter
//!
//! Provides:
//! - Client construction from region, endpoint and static access keys
//! - Digest lookup through `HeadObject` custom metadata
//! - Single-request and multipart uploads that carry the digest metadata
//! - Classification of SDK failures into transient and permanent errors
//!
//! ## Modules
//!
//! - [`client`] - `aws_sdk_s3::Client` construction
//! - [`error`] - SDK error classification
//! - [`provider`] - [`IObjectStore`](s3putsecure_core::ports::IObjectStore) implementation
//! - [`upload`] - Single PUT and multipart upload

pub mod client;
pub mod error;
pub mod provider;
pub mod upload;

pub use client::{build_client, AccessKeys, ClientSettings};
pub use provider::S3ObjectStore;
pub use upload::TransferSettings;
