//! HeadBucket and CreateBucket

use s3putsecure_core::ports::IObjectStore;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_bucket_exists() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/backups"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = common::store(&server);
    assert!(store.bucket_exists(&common::bucket()).await.unwrap());
}

#[tokio::test]
async fn test_bucket_missing() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/backups"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = common::store(&server);
    assert!(!store.bucket_exists(&common::bucket()).await.unwrap());
}

#[tokio::test]
async fn test_bucket_forbidden_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/backups"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let store = common::store(&server);
    assert!(store.bucket_exists(&common::bucket()).await.is_err());
}

#[tokio::test]
async fn test_create_bucket_in_default_region() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/backups"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = common::store(&server);
    store.create_bucket(&common::bucket()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains("LocationConstraint"));
}

#[tokio::test]
async fn test_create_bucket_sets_location_constraint() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/backups"))
        .and(body_string_contains(
            "<LocationConstraint>eu-west-1</LocationConstraint>",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = common::store_in_region(&server, "eu-west-1");
    store.create_bucket(&common::bucket()).await.unwrap();
}

#[tokio::test]
async fn test_create_bucket_conflict_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/backups"))
        .respond_with(ResponseTemplate::new(409).set_body_string(
            "<Error><Code>BucketAlreadyExists</Code><Message>taken</Message></Error>",
        ))
        .mount(&server)
        .await;

    let store = common::store(&server);
    let err = store.create_bucket(&common::bucket()).await.unwrap_err();
    assert!(format!("{err:#}").contains("BucketAlreadyExists"));
}
