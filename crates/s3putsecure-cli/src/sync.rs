//! The sync run behind `s3putsecure <SOURCE> <BUCKET>`
//!
//! 1. Checks the source directory, then builds the S3 adapter from the configuration and access keys
//! 2. Checks that GnuPG is usable when encryption is enabled
//! 3. Opens (or creates) the bucket
//! 4. Runs the SyncEngine and displays the summary

use std::sync::Arc;

use anyhow::{Context, Result};
use s3putsecure_core::config::Config;
use s3putsecure_core::domain::newtypes::{BucketName, SourceRoot};
use s3putsecure_core::domain::record::EncryptionMode;
use s3putsecure_s3::{build_client, AccessKeys, ClientSettings, S3ObjectStore, TransferSettings};
use s3putsecure_sync::retry::RetryPolicy;
use s3putsecure_sync::{
    BucketStatus, ExclusionFilter, GpgEncryptor, GpgMode, SyncEngine, SyncOptions, SyncResult,
};
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::progress::ConsoleObserver;

/// Everything a run needs, resolved from flags, environment and config
#[derive(Debug)]
pub struct SyncRequest {
    pub root: SourceRoot,
    pub bucket: BucketName,
    pub mode: EncryptionMode,
    pub keys: AccessKeys,
    pub simulate: bool,
    pub create_bucket: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl SyncRequest {
    fn options(&self, config: &Config) -> SyncOptions {
        SyncOptions {
            bucket: self.bucket.clone(),
            simulate: self.simulate,
            create_bucket: self.create_bucket,
            mode: self.mode.clone(),
            retry: RetryPolicy::new(config.transfer.max_retries),
            staging_dir: config.encryption.staging_dir.clone(),
        }
    }
}

/// Runs the sync and prints the summary
pub async fn execute(
    request: &SyncRequest,
    config: &Config,
    format: OutputFormat,
) -> Result<SyncResult> {
    let formatter = get_formatter(format, request.quiet);

    if !request.mode.is_enabled() {
        formatter.warn("Encryption disabled as requested");
    }

    SyncEngine::check_source(&request.root).await?;

    let client = build_client(&ClientSettings::from_config(config), &request.keys);
    let store = Arc::new(
        S3ObjectStore::new(client)
            .with_metadata_key(config.sync.metadata_key.clone())
            .with_transfer(TransferSettings::from_config(config)),
    );

    let options = request.options(config);
    let mut engine = match GpgMode::from_encryption_mode(&request.mode) {
        Some(mode) => {
            let gpg = GpgEncryptor::new(mode)
                .with_program(config.encryption.gpg_program.clone())
                .with_timeout(config.encryption_timeout());
            let version = gpg
                .probe()
                .await
                .with_context(|| format!("Cannot run {}", config.encryption.gpg_program))?;
            info!(%version, "GnuPG available");
            SyncEngine::with_encryptor(store, Arc::new(gpg), options)?
        }
        None => SyncEngine::new(store, options)?,
    };

    engine.set_exclusions(ExclusionFilter::new(&config.sync.exclude)?);
    engine.set_observer(Arc::new(
        ConsoleObserver::new(get_formatter(format, request.quiet), request.bucket.clone())
            .verbose(request.verbose)
            .progress_bar(format == OutputFormat::Human && !request.quiet),
    ));

    formatter.info("Opening bucket...");
    let status = engine.ensure_bucket().await?;
    match status {
        BucketStatus::Created => formatter.info(&format!("Created bucket {}", request.bucket)),
        BucketStatus::WouldCreate => {
            formatter.info(&format!("Bucket {} would be created", request.bucket))
        }
        BucketStatus::Existing => {}
    }

    let result = engine.sync(&request.root, status).await?;
    display_result(formatter.as_ref(), format, &result, status);
    Ok(result)
}

fn plural(n: u32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Formats a duration given in milliseconds
pub fn format_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

/// Summary lines for human output
pub fn summary_lines(result: &SyncResult) -> Vec<String> {
    let mut lines = Vec::new();
    let counts = [
        ("Created: ", result.files_created),
        ("Replaced:", result.files_replaced),
        ("Skipped: ", result.files_skipped),
        ("Excluded:", result.files_excluded),
    ];
    for (label, n) in counts {
        if n > 0 {
            lines.push(format!("{label} {n} file{}", plural(n)));
        }
    }
    if result.bytes_uploaded > 0 {
        lines.push(format!(
            "Uploaded: {}",
            indicatif::HumanBytes(result.bytes_uploaded)
        ));
    }
    lines
}

fn display_result(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    result: &SyncResult,
    status: BucketStatus,
) {
    if format == OutputFormat::Json {
        let mut json = serde_json::to_value(result).unwrap_or_default();
        if let Some(map) = json.as_object_mut() {
            map.insert("bucket_status".to_string(), serde_json::json!(status));
        }
        formatter.event("summary", json);
        return;
    }

    let duration = format_duration(result.duration_ms);
    if result.is_up_to_date() {
        formatter.success("Already up to date");
    } else if result.simulated {
        formatter.success(&format!("Simulation completed in {duration}"));
    } else {
        formatter.success(&format!("Sync completed in {duration}"));
    }

    for line in summary_lines(result) {
        formatter.info(&line);
    }

    if result.has_errors() {
        let n = result.errors.len() as u32;
        formatter.error(&format!("{n} error{} occurred:", plural(n)));
        for err in &result.errors {
            formatter.info(&format!("  - {err}"));
        }
    }
}
