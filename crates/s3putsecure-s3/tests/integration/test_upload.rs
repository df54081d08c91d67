//! Single-request and multipart uploads

use std::sync::{Arc, Mutex};

use s3putsecure_core::ports::{IObjectStore, StoreError};
use s3putsecure_s3::TransferSettings;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

const MIB: usize = 1024 * 1024;

fn recorder() -> (Arc<Mutex<Vec<(u64, u64)>>>, impl FnMut(u64, u64) + Send) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    (calls, move |done, total| sink.lock().unwrap().push((done, total)))
}

#[tokio::test]
async fn test_put_object_sends_body_and_digest() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/backups/dir/a.txt"))
        .and(header("x-amz-meta-s3putsecure-md5", common::HELLO_MD5))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"etag-1\""))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = common::write_source(dir.path(), "a.txt", b"hello");
    let request = common::upload_request("dir/a.txt", source, common::HELLO_MD5);

    let (calls, mut progress) = recorder();
    let store = common::store(&server);
    let sent = store.put_object(&request, &mut progress).await.unwrap();

    assert_eq!(sent, 5);
    assert_eq!(*calls.lock().unwrap(), vec![(0, 5), (5, 5)]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, b"hello");
}

#[tokio::test]
async fn test_put_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/backups/empty"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = common::write_source(dir.path(), "empty", b"");
    let request =
        common::upload_request("empty", source, "d41d8cd98f00b204e9800998ecf8427e");

    let (calls, mut progress) = recorder();
    let sent = common::store(&server)
        .put_object(&request, &mut progress)
        .await
        .unwrap();

    assert_eq!(sent, 0);
    assert_eq!(calls.lock().unwrap().last(), Some(&(0, 0)));
}

#[tokio::test]
async fn test_put_object_access_denied_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/backups/a.txt"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = common::write_source(dir.path(), "a.txt", b"hello");
    let request = common::upload_request("a.txt", source, common::HELLO_MD5);

    let (_, mut progress) = recorder();
    let err = common::store(&server)
        .put_object(&request, &mut progress)
        .await
        .unwrap_err();

    match err.downcast_ref::<StoreError>() {
        Some(StoreError::Rejected(detail)) => assert!(detail.contains("AccessDenied")),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_put_object_missing_source() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let request =
        common::upload_request("a.txt", dir.path().join("gone.gpg"), common::HELLO_MD5);

    let (_, mut progress) = recorder();
    let err = common::store(&server)
        .put_object(&request, &mut progress)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::Source { .. })
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

async fn mount_multipart_start(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/backups/big.bin"))
        .and(query_param("uploads", ""))
        .and(header("x-amz-meta-s3putsecure-md5", common::HELLO_MD5))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <InitiateMultipartUploadResult>\
             <Bucket>backups</Bucket><Key>big.bin</Key><UploadId>up-1</UploadId>\
             </InitiateMultipartUploadResult>",
        ))
        .expect(1)
        .mount(server)
        .await;
}

fn multipart_store(server: &MockServer) -> s3putsecure_s3::S3ObjectStore {
    common::store(server).with_transfer(TransferSettings {
        multipart_threshold: 5 * MIB as u64,
        part_size: 5 * MIB as u64,
    })
}

#[tokio::test]
async fn test_multipart_upload() {
    let server = MockServer::start().await;
    mount_multipart_start(&server).await;

    Mock::given(method("PUT"))
        .and(path("/backups/big.bin"))
        .and(query_param("uploadId", "up-1"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"part\""))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/backups/big.bin"))
        .and(query_param("uploadId", "up-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<CompleteMultipartUploadResult>\
             <Bucket>backups</Bucket><Key>big.bin</Key><ETag>\"abc-2\"</ETag>\
             </CompleteMultipartUploadResult>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = common::write_source(dir.path(), "big.bin", &vec![7u8; 6 * MIB]);
    let request = common::upload_request("big.bin", source, common::HELLO_MD5);

    let (calls, mut progress) = recorder();
    let sent = multipart_store(&server)
        .put_object(&request, &mut progress)
        .await
        .unwrap();

    let total = 6 * MIB as u64;
    assert_eq!(sent, total);
    assert_eq!(
        *calls.lock().unwrap(),
        vec![(0, total), (5 * MIB as u64, total), (total, total)]
    );

    let part_sizes: Vec<usize> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| r.body.len())
        .collect();
    assert_eq!(part_sizes, vec![5 * MIB, MIB]);
}

#[tokio::test]
async fn test_multipart_failure_aborts_upload() {
    let server = MockServer::start().await;
    mount_multipart_start(&server).await;

    Mock::given(method("PUT"))
        .and(path("/backups/big.bin"))
        .and(query_param("uploadId", "up-1"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
        ))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/backups/big.bin"))
        .and(query_param("uploadId", "up-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = common::write_source(dir.path(), "big.bin", &vec![1u8; 6 * MIB]);
    let request = common::upload_request("big.bin", source, common::HELLO_MD5);

    let (_, mut progress) = recorder();
    let err = multipart_store(&server)
        .put_object(&request, &mut progress)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::Rejected(_))
    ));
}
