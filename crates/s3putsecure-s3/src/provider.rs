//! S3ObjectStore - IObjectStore implementation for Amazon S3
//!
//! Wraps an `aws_sdk_s3::Client` and delegates uploads to the [`upload`]
//! module.
//!
//! ## Design Notes
//!
//! - The plaintext digest is stored as user metadata under
//!   `metadata_key`; S3 returns it as `x-amz-meta-<metadata_key>`.
//! - A `404` on `HeadObject` means the key is absent, not an error.
//! - Failures are returned as [`StoreError`] inside `anyhow::Error`; the
//!   sync engine downcasts them to decide on retries.

use anyhow::Result;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use tracing::{debug, info, instrument};

use s3putsecure_core::domain::newtypes::{BucketName, LogicalKey};
use s3putsecure_core::domain::record::RemoteObject;
use s3putsecure_core::ports::{
    IObjectStore, ProgressFn, UploadRequest, DEFAULT_DIGEST_METADATA_KEY,
};

use crate::error::classify;
use crate::upload::{self, TransferSettings};

/// Region that takes no location constraint on bucket creation
const DEFAULT_REGION: &str = "us-east-1";

/// [`IObjectStore`] backed by Amazon S3 or an S3-compatible service
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    metadata_key: String,
    transfer: TransferSettings,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            metadata_key: DEFAULT_DIGEST_METADATA_KEY.to_string(),
            transfer: TransferSettings::default(),
        }
    }

    /// Store the digest under a different metadata name
    pub fn with_metadata_key(mut self, key: impl Into<String>) -> Self {
        self.metadata_key = key.into();
        self
    }

    /// Override multipart threshold and part size
    pub fn with_transfer(mut self, transfer: TransferSettings) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn metadata_key(&self) -> &str {
        &self.metadata_key
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait::async_trait]
impl IObjectStore for S3ObjectStore {
    #[instrument(skip(self), fields(bucket = %bucket))]
    async fn bucket_exists(&self, bucket: &BucketName) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket.as_str()).send().await {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.as_service_error(), Some(e) if e.is_not_found()) => {
                debug!("bucket not found");
                Ok(false)
            }
            Err(err) => Err(classify(err, "HeadBucket").into()),
        }
    }

    #[instrument(skip(self), fields(bucket = %bucket))]
    async fn create_bucket(&self, bucket: &BucketName) -> Result<()> {
        let region = self
            .client
            .config()
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut request = self.client.create_bucket().bucket(bucket.as_str());
        if region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region.as_str()))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| classify(e, "CreateBucket"))?;
        info!(%region, "Bucket created");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %bucket, key = %key))]
    async fn head_object(
        &self,
        bucket: &BucketName,
        key: &LogicalKey,
    ) -> Result<Option<RemoteObject>> {
        let output = match self
            .client
            .head_object()
            .bucket(bucket.as_str())
            .key(key.as_str())
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if matches!(err.as_service_error(), Some(e) if e.is_not_found()) => {
                debug!("object absent");
                return Ok(None);
            }
            Err(err) => return Err(classify(err, "HeadObject").into()),
        };

        let digest = output
            .metadata()
            .and_then(|m| m.get(&self.metadata_key))
            .cloned();
        debug!(digest = ?digest, "object found");

        Ok(Some(RemoteObject {
            key: key.clone(),
            digest,
            etag: output.e_tag().map(str::to_string),
            size: output.content_length().and_then(|n| u64::try_from(n).ok()),
        }))
    }

    #[instrument(skip(self, request, progress), fields(bucket = %request.bucket, key = %request.key))]
    async fn put_object(&self, request: &UploadRequest, progress: ProgressFn<'_>) -> Result<u64> {
        let bytes = upload::put_file(
            &self.client,
            request,
            &self.metadata_key,
            self.transfer,
            progress,
        )
        .await?;
        Ok(bytes)
    }
}
