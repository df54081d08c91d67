//! Integration tests for s3putsecure-s3
//!
//! Uses wiremock to stand in for an S3-compatible endpoint (path-style
//! addressing) and verifies the requests the adapter sends and how it
//! interprets responses.

mod common;

mod test_bucket;
mod test_upload;
