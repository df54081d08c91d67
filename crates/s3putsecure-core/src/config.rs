//! Configuration module for s3putsecure.
//!
//! Provides typed configuration structs that map to the optional YAML
//! configuration file, with loading, validation, defaults, and a builder
//! used to apply command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ports::DEFAULT_DIGEST_METADATA_KEY;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for s3putsecure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub s3: S3Config,
    pub transfer: TransferConfig,
    pub encryption: EncryptionConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Object store endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Region the bucket lives in (and where new buckets are created).
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, Ceph, ...).
    pub endpoint_url: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub force_path_style: bool,
}

/// Upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Files of at least this size (in MiB) use multipart upload.
    pub multipart_threshold_mb: u64,
    /// Size of each multipart part (in MiB, minimum 5).
    pub part_size_mb: u64,
    /// Retries for transient store failures.
    pub max_retries: u32,
    /// Upper bound for a single store operation, in seconds.
    pub network_timeout_secs: u64,
}

/// Encryption tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// GnuPG executable name or path.
    pub gpg_program: String,
    /// Upper bound for one encryption, in seconds.
    pub timeout_secs: u64,
    /// Parent directory for the per-run staging directory. System temp dir when unset.
    pub staging_dir: Option<PathBuf>,
}

/// Tree walk and change detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Glob patterns matched against full paths; matching files are skipped.
    pub exclude: Vec<String>,
    /// Name of the custom metadata entry holding the plaintext digest.
    pub metadata_key: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/s3putsecure/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("s3putsecure")
            .join("config.yaml")
    }

    /// Multipart threshold in bytes.
    pub fn multipart_threshold_bytes(&self) -> u64 {
        self.transfer.multipart_threshold_mb * 1024 * 1024
    }

    /// Multipart part size in bytes.
    pub fn part_size_bytes(&self) -> u64 {
        self.transfer.part_size_mb * 1024 * 1024
    }

    /// Network timeout as a [`Duration`].
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer.network_timeout_secs)
    }

    /// Encryption timeout as a [`Duration`].
    pub fn encryption_timeout(&self) -> Duration {
        Duration::from_secs(self.encryption.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            multipart_threshold_mb: 16,
            part_size_mb: 8,
            max_retries: 5,
            network_timeout_secs: 300,
        }
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            gpg_program: "gpg".to_string(),
            timeout_secs: 600,
            staging_dir: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            metadata_key: DEFAULT_DIGEST_METADATA_KEY.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transfer.part_size_mb"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Smallest part size S3 accepts for all but the last part.
const MIN_PART_SIZE_MB: u64 = 5;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// `encrypting` says whether the run will encrypt; the staging
    /// directory is only checked when it will be used. An empty vector
    /// means the configuration is valid.
    pub fn validate(&self, encrypting: bool) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- s3 ---
        if self.s3.region.trim().is_empty() {
            errors.push(ValidationError {
                field: "s3.region".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(endpoint) = &self.s3.endpoint_url {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ValidationError {
                    field: "s3.endpoint_url".into(),
                    message: format!("must start with http:// or https://, got '{endpoint}'"),
                });
            }
        }

        // --- transfer ---
        if self.transfer.part_size_mb < MIN_PART_SIZE_MB {
            errors.push(ValidationError {
                field: "transfer.part_size_mb".into(),
                message: format!("must be at least {MIN_PART_SIZE_MB}"),
            });
        }
        if self.transfer.multipart_threshold_mb == 0 {
            errors.push(ValidationError {
                field: "transfer.multipart_threshold_mb".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.transfer.part_size_mb > self.transfer.multipart_threshold_mb {
            errors.push(ValidationError {
                field: "transfer.part_size_mb".into(),
                message: format!(
                    "part_size_mb ({}) must not exceed multipart_threshold_mb ({})",
                    self.transfer.part_size_mb, self.transfer.multipart_threshold_mb
                ),
            });
        }
        if self.transfer.network_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "transfer.network_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- encryption ---
        if self.encryption.gpg_program.trim().is_empty() {
            errors.push(ValidationError {
                field: "encryption.gpg_program".into(),
                message: "must not be empty".into(),
            });
        }
        if self.encryption.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "encryption.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if let Some(dir) = self.encryption.staging_dir.as_ref().filter(|_| encrypting) {
            if !dir.is_dir() {
                errors.push(ValidationError {
                    field: "encryption.staging_dir".into(),
                    message: format!("directory does not exist: {}", dir.display()),
                });
            }
        }

        // --- sync ---
        let key = &self.sync.metadata_key;
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            errors.push(ValidationError {
                field: "sync.metadata_key".into(),
                message: format!(
                    "invalid key '{key}'; use lowercase letters, digits and '-'"
                ),
            });
        }
        for pattern in &self.sync.exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ValidationError {
                    field: "sync.exclude".into(),
                    message: format!("invalid pattern '{pattern}': {}", e.msg),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] (or a loaded file via [`ConfigBuilder::from_config`])
/// and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use s3putsecure_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .s3_region("eu-west-1")
///     .add_exclude("*.tmp")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Create a builder that starts from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- s3 ---

    pub fn s3_region(mut self, region: impl Into<String>) -> Self {
        self.config.s3.region = region.into();
        self
    }

    pub fn s3_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.s3.endpoint_url = Some(url.into());
        self
    }

    pub fn s3_force_path_style(mut self, enabled: bool) -> Self {
        self.config.s3.force_path_style = enabled;
        self
    }

    // --- transfer ---

    pub fn transfer_multipart_threshold_mb(mut self, mb: u64) -> Self {
        self.config.transfer.multipart_threshold_mb = mb;
        self
    }

    pub fn transfer_part_size_mb(mut self, mb: u64) -> Self {
        self.config.transfer.part_size_mb = mb;
        self
    }

    pub fn transfer_max_retries(mut self, n: u32) -> Self {
        self.config.transfer.max_retries = n;
        self
    }

    pub fn transfer_network_timeout_secs(mut self, secs: u64) -> Self {
        self.config.transfer.network_timeout_secs = secs;
        self
    }

    // --- encryption ---

    pub fn encryption_gpg_program(mut self, program: impl Into<String>) -> Self {
        self.config.encryption.gpg_program = program.into();
        self
    }

    pub fn encryption_timeout_secs(mut self, secs: u64) -> Self {
        self.config.encryption.timeout_secs = secs;
        self
    }

    pub fn encryption_staging_dir(mut self, dir: PathBuf) -> Self {
        self.config.encryption.staging_dir = Some(dir);
        self
    }

    // --- sync ---

    pub fn add_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.sync.exclude.push(pattern.into());
        self
    }

    pub fn sync_metadata_key(mut self, key: impl Into<String>) -> Self {
        self.config.sync.metadata_key = key.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self, encrypting: bool) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate(encrypting);
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
