//! S3 client construction
//!
//! Builds an `aws_sdk_s3::Client` from explicit settings and static access
//! keys; no shared AWS profile or instance metadata is consulted.
//!
//! The client does not retry on its own: the sync engine owns the retry
//! policy so lookups and uploads back off the same way. Every operation is
//! bounded by the configured network timeout.

use std::fmt;
use std::time::Duration;

use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation,
    ResponseChecksumValidation,
};
use aws_sdk_s3::Client;
use s3putsecure_core::config::Config;
use tracing::debug;
use zeroize::Zeroizing;

/// Upper bound for establishing a connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Name reported for the static credentials
const CREDENTIALS_PROVIDER: &str = "s3putsecure";

/// Static access key pair
#[derive(Clone)]
pub struct AccessKeys {
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
}

impl AccessKeys {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }
}

impl fmt::Debug for AccessKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Endpoint and timeout settings for the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub region: String,
    /// Custom endpoint for S3-compatible services
    pub endpoint_url: Option<String>,
    /// `endpoint/bucket/key` addressing instead of virtual-hosted buckets
    pub force_path_style: bool,
    /// Upper bound for one operation (one PUT, one part, one HEAD)
    pub network_timeout: Duration,
}

impl ClientSettings {
    /// Takes the `s3` and `transfer` sections of the configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            region: config.s3.region.clone(),
            endpoint_url: config.s3.endpoint_url.clone(),
            force_path_style: config.s3.force_path_style,
            network_timeout: config.network_timeout(),
        }
    }
}

/// Builds an S3 client with SDK retries disabled
pub fn build_client(settings: &ClientSettings, keys: &AccessKeys) -> Client {
    let credentials = Credentials::new(
        keys.access_key_id.clone(),
        keys.secret_access_key.as_str(),
        None,
        None,
        CREDENTIALS_PROVIDER,
    );

    let timeouts = TimeoutConfig::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .operation_timeout(settings.network_timeout)
        .build();

    let mut builder = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .credentials_provider(credentials)
        .force_path_style(settings.force_path_style)
        .retry_config(RetryConfig::disabled())
        .timeout_config(timeouts)
        // S3-compatible services often reject the newer default checksums
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired);

    if let Some(endpoint) = &settings.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }

    debug!(
        region = %settings.region,
        endpoint = ?settings.endpoint_url,
        path_style = settings.force_path_style,
        access_key_id = %keys.access_key_id,
        "S3 client configured"
    );

    Client::from_conf(builder.build())
}
