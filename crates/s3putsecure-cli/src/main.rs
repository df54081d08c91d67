//! s3putsecure CLI - mirror a directory tree into an S3 bucket
//!
//! Every file is fingerprinted, compared with the digest stored on the
//! remote object, and uploaded (GnuPG-encrypted unless `--no-encrypt`)
//! only when it is new or changed.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use s3putsecure_core::config::{Config, ConfigBuilder};
use s3putsecure_core::domain::newtypes::{BucketName, SourceRoot};
use tracing_subscriber::EnvFilter;

mod credentials;
mod output;
mod progress;
mod sync;

use credentials::{process_env, resolve_access_keys, resolve_encryption};
use output::{get_formatter, OutputFormat};
use sync::SyncRequest;

/// Exit status for usage and configuration errors reported by clap
const USAGE_EXIT: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "s3putsecure",
    version,
    about = "Mirror a directory into an S3 bucket, encrypting each file with GnuPG"
)]
pub struct Cli {
    /// Directory to upload
    source: PathBuf,

    /// Target bucket
    bucket: String,

    /// GnuPG recipient, or the passphrase with --symmetric
    recipient_or_passphrase: Option<String>,

    /// Decide and report only; nothing is created or uploaded
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Access key id
    #[arg(short, long)]
    access_key: Option<String>,

    /// Secret access key
    #[arg(short, long)]
    secret_key: Option<String>,

    /// Create the bucket if it does not exist
    #[arg(short, long)]
    create: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Encrypt symmetrically with the given passphrase
    #[arg(short = 'S', long, conflicts_with = "no_encrypt")]
    symmetric: bool,

    /// Upload plaintext
    #[arg(short = 'D', long, visible_alias = "disable-encryption")]
    no_encrypt: bool,

    /// Skip paths matching this glob (can be repeated)
    #[arg(short = 'X', long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,

    /// Bucket region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Endpoint of an S3-compatible service
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Minimal output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: Config) -> ConfigBuilder {
        let mut builder = ConfigBuilder::from_config(config);
        if let Some(region) = &self.region {
            builder = builder.s3_region(region.clone());
        }
        if let Some(endpoint) = &self.endpoint_url {
            builder = builder.s3_endpoint_url(endpoint.clone());
        }
        for pattern in &self.excludes {
            builder = builder.add_exclude(pattern.clone());
        }
        builder
    }
}

/// Loads the configuration file
///
/// An explicit `--config` must exist and parse; the default location is
/// optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::load_or_default(&Config::default_path())),
    }
}

/// Log filter: `RUST_LOG` wins, then `-v`/`-vv`, then the configured level
fn log_filter(verbose: u8, configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = match verbose {
            0 => configured.to_string(),
            1 => "debug,aws_smithy_runtime=info,aws_sdk_s3=info,hyper=info".to_string(),
            _ => "trace".to_string(),
        };
        EnvFilter::new(directives)
    })
}

fn usage_error(message: impl std::fmt::Display) -> ExitCode {
    let err = Cli::command().error(ErrorKind::MissingRequiredArgument, message);
    let _ = err.print();
    ExitCode::from(USAGE_EXIT)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let format = cli.format();
    let formatter = get_formatter(format, cli.quiet);

    let builder = cli.apply_overrides(load_config(cli.config.as_deref())?);

    let mode = match resolve_encryption(
        cli.no_encrypt,
        cli.symmetric,
        cli.recipient_or_passphrase.as_deref(),
        process_env,
    ) {
        Ok(mode) => mode,
        Err(err) if err.is_usage() => return Ok(usage_error(err)),
        Err(err) => return Err(err.into()),
    };

    let config = match builder.build_validated(mode.is_enabled()) {
        Ok(config) => config,
        Err(errors) => {
            for err in &errors {
                formatter.error(&err.to_string());
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, &config.logging.level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.no_encrypt && cli.recipient_or_passphrase.is_some() {
        formatter.warn("Ignoring recipient/passphrase argument because encryption is disabled");
    }

    let keys = resolve_access_keys(
        cli.access_key.as_deref(),
        cli.secret_key.as_deref(),
        process_env,
    )?;

    let request = SyncRequest {
        root: SourceRoot::new(cli.source.clone())?,
        bucket: BucketName::new(cli.bucket.clone())?,
        mode,
        keys,
        simulate: cli.dry_run,
        create_bucket: cli.create,
        verbose: cli.verbose > 0,
        quiet: cli.quiet,
    };

    let result = sync::execute(&request, &config, format).await?;
    Ok(if result.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let formatter = get_formatter(cli.format(), false);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            formatter.error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
