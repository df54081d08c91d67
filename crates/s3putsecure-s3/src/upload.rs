//! Upload operations for Amazon S3
//!
//! Provides:
//! - [`put_file`] - Picks single-request or multipart upload by size
//! - Single `PutObject` for files below the multipart threshold
//! - Multipart upload (`CreateMultipartUpload` → `UploadPart`* →
//!   `CompleteMultipartUpload`) for larger files, aborted on failure so no
//!   orphaned parts are billed
//!
//! The digest metadata is attached to `PutObject` or to
//! `CreateMultipartUpload`, so it becomes visible together with the content
//! and never describes content the object does not hold.

use std::path::Path;

use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use s3putsecure_core::ports::{ProgressFn, StoreError, UploadRequest};
use tracing::{debug, info, warn};

use crate::error::classify;

/// Smallest part S3 accepts (except the last one): 5 MiB
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Most parts a single multipart upload may have
const MAX_PARTS: u64 = 10_000;

/// Size thresholds for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    /// Files of at least this many bytes use multipart upload
    pub multipart_threshold: u64,
    /// Bytes per part
    pub part_size: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            multipart_threshold: 16 * 1024 * 1024,
            part_size: 8 * 1024 * 1024,
        }
    }
}

impl TransferSettings {
    /// Takes the `transfer` section of the configuration
    pub fn from_config(config: &s3putsecure_core::config::Config) -> Self {
        Self {
            multipart_threshold: config.multipart_threshold_bytes(),
            part_size: config.part_size_bytes(),
        }
    }
}

/// Part size actually used for a file of `total` bytes
///
/// At least [`MIN_PART_SIZE`], and large enough that the file fits in
/// 10,000 parts.
pub fn effective_part_size(total: u64, requested: u64) -> u64 {
    let fit = total.div_ceil(MAX_PARTS);
    requested.max(MIN_PART_SIZE).max(fit)
}

/// Uploads `request.source` and returns the number of bytes sent
pub async fn put_file(
    client: &Client,
    request: &UploadRequest,
    metadata_key: &str,
    settings: TransferSettings,
    progress: ProgressFn<'_>,
) -> Result<u64, StoreError> {
    let total = tokio::fs::metadata(&request.source)
        .await
        .map_err(|source| StoreError::Source {
            path: request.source.clone(),
            source,
        })?
        .len();

    if total >= settings.multipart_threshold {
        let part_size = effective_part_size(total, settings.part_size);
        upload_multipart(client, request, metadata_key, total, part_size, progress).await?;
    } else {
        upload_single(client, request, metadata_key, total, progress).await?;
    }
    Ok(total)
}

async fn read_range(path: &Path, offset: u64, len: u64) -> Result<ByteStream, StoreError> {
    ByteStream::read_from()
        .path(path)
        .offset(offset)
        .length(Length::Exact(len))
        .build()
        .await
        .map_err(|e| StoreError::Source {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })
}

#[tracing::instrument(skip_all, fields(bucket = %request.bucket, key = %request.key, total = total))]
async fn upload_single(
    client: &Client,
    request: &UploadRequest,
    metadata_key: &str,
    total: u64,
    progress: ProgressFn<'_>,
) -> Result<(), StoreError> {
    progress(0, total);
    let body = if total == 0 {
        ByteStream::from_static(b"")
    } else {
        read_range(&request.source, 0, total).await?
    };

    client
        .put_object()
        .bucket(request.bucket.as_str())
        .key(request.key.as_str())
        .metadata(metadata_key, request.digest.as_str())
        .content_length(total as i64)
        .body(body)
        .send()
        .await
        .map_err(|e| classify(e, "PutObject"))?;

    progress(total, total);
    debug!("object uploaded");
    Ok(())
}

#[tracing::instrument(skip_all, fields(bucket = %request.bucket, key = %request.key, total = total, part_size = part_size))]
async fn upload_multipart(
    client: &Client,
    request: &UploadRequest,
    metadata_key: &str,
    total: u64,
    part_size: u64,
    progress: ProgressFn<'_>,
) -> Result<(), StoreError> {
    let created = client
        .create_multipart_upload()
        .bucket(request.bucket.as_str())
        .key(request.key.as_str())
        .metadata(metadata_key, request.digest.as_str())
        .send()
        .await
        .map_err(|e| classify(e, "CreateMultipartUpload"))?;

    let upload_id = created
        .upload_id()
        .ok_or_else(|| {
            StoreError::Rejected("CreateMultipartUpload returned no upload id".to_string())
        })?
        .to_string();
    info!(upload_id = %upload_id, "Multipart upload started");

    let result: Result<(), StoreError> = async {
        let parts = upload_parts(client, request, &upload_id, total, part_size, progress).await?;
        client
            .complete_multipart_upload()
            .bucket(request.bucket.as_str())
            .key(request.key.as_str())
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| classify(e, "CompleteMultipartUpload"))?;
        Ok(())
    }
    .await;

    if let Err(err) = &result {
        warn!(upload_id = %upload_id, error = %err, "Aborting multipart upload");
        abort(client, request, &upload_id).await;
    }
    result
}

async fn upload_parts(
    client: &Client,
    request: &UploadRequest,
    upload_id: &str,
    total: u64,
    part_size: u64,
    progress: ProgressFn<'_>,
) -> Result<Vec<CompletedPart>, StoreError> {
    let mut parts = Vec::new();
    let mut offset = 0u64;
    let mut part_number = 1i32;

    progress(0, total);
    while offset < total {
        let len = part_size.min(total - offset);
        let body = read_range(&request.source, offset, len).await?;

        let uploaded = client
            .upload_part()
            .bucket(request.bucket.as_str())
            .key(request.key.as_str())
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(len as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| classify(e, "UploadPart"))?;

        parts.push(
            CompletedPart::builder()
                .set_e_tag(uploaded.e_tag().map(str::to_string))
                .part_number(part_number)
                .build(),
        );

        offset += len;
        debug!(part_number, offset, "part uploaded");
        progress(offset, total);
        part_number += 1;
    }

    Ok(parts)
}

async fn abort(client: &Client, request: &UploadRequest, upload_id: &str) {
    let aborted = client
        .abort_multipart_upload()
        .bucket(request.bucket.as_str())
        .key(request.key.as_str())
        .upload_id(upload_id)
        .send()
        .await;
    if let Err(e) = aborted {
        warn!(
            upload_id,
            error = %classify(e, "AbortMultipartUpload"),
            "Failed to abort multipart upload; parts may remain until a lifecycle rule removes them"
        );
    }
}
