//! Integration tests for s3putsecure-sync
//!
//! Runs the sync engine against an in-memory object store and a fake
//! encryption provider over real temporary directory trees.

mod common;

mod test_pipeline;
