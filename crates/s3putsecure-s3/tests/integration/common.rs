//! Shared helpers for S3 adapter integration tests

use std::path::{Path, PathBuf};
use std::time::Duration;

use wiremock::MockServer;

use s3putsecure_core::domain::newtypes::{BucketName, ContentDigest, LogicalKey};
use s3putsecure_core::ports::UploadRequest;
use s3putsecure_s3::{build_client, AccessKeys, ClientSettings, S3ObjectStore};

/// md5("hello")
pub const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

pub const BUCKET: &str = "backups";

/// Builds a store pointed at the mock server in the given region
pub fn store_in_region(server: &MockServer, region: &str) -> S3ObjectStore {
    let settings = ClientSettings {
        region: region.to_string(),
        endpoint_url: Some(server.uri()),
        force_path_style: true,
        network_timeout: Duration::from_secs(5),
    };
    let keys = AccessKeys::new("AKIDTEST", "secret-test-key");
    S3ObjectStore::new(build_client(&settings, &keys))
}

pub fn store(server: &MockServer) -> S3ObjectStore {
    store_in_region(server, "us-east-1")
}

pub fn bucket() -> BucketName {
    BucketName::new(BUCKET.to_string()).unwrap()
}

pub fn key(key: &str) -> LogicalKey {
    LogicalKey::new(key.to_string()).unwrap()
}

/// Writes `content` to `dir/name` and returns its path
pub fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn upload_request(key_str: &str, source: PathBuf, digest: &str) -> UploadRequest {
    UploadRequest {
        bucket: bucket(),
        key: key(key_str),
        source,
        digest: ContentDigest::new(digest.to_string()).unwrap(),
    }
}
