//! SDK error classification
//!
//! Maps `aws_sdk_s3` failures onto [`StoreError`] so the sync engine can
//! tell what is worth retrying:
//!
//! - timeouts, dispatch and response failures → `Transient`
//! - service errors with status 408, 429 or 5xx → `Transient`
//! - `NoSuchBucket` → `BucketNotFound`
//! - every other service error → `Rejected`

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use s3putsecure_core::ports::StoreError;

/// Returns true for HTTP statuses worth retrying
pub fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

/// Converts an SDK failure of `operation` into a [`StoreError`]
pub fn classify<E>(err: SdkError<E, HttpResponse>, operation: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(service) => {
            let status = service.raw().status().as_u16();
            let code = service.err().code().unwrap_or("Unknown");
            let message = service.err().message().unwrap_or("no message");
            let detail = format!("{operation} failed with status {status} ({code}): {message}");

            if is_transient_status(status) {
                StoreError::Transient(detail)
            } else if code == "NoSuchBucket" {
                StoreError::BucketNotFound(detail)
            } else {
                StoreError::Rejected(detail)
            }
        }
        SdkError::ConstructionFailure(_) => {
            StoreError::Rejected(format!("{operation}: {}", DisplayErrorContext(&err)))
        }
        _ => StoreError::Transient(format!("{operation}: {}", DisplayErrorContext(&err))),
    }
}
