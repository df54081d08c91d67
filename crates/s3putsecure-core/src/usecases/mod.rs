//! Use cases (interactors) for s3putsecure
//!
//! Use cases are thin coordinators that delegate business rules to domain
//! types and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`decide`] - Skip / Create / Replace classification of a local file
//! - [`RemoteStateReader`] - Read-only lookup of stored digests

pub mod decide_sync;

pub use decide_sync::{decide, RemoteStateReader};
