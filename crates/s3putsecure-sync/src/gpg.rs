//! GnuPG encryption provider
//!
//! Encrypts each file with the `gpg` executable into a staging path.
//! Public-key mode encrypts for a recipient from the user's keyring;
//! symmetric mode feeds the passphrase on stdin with loopback pinentry, so
//! no agent prompt or tty is needed and the secret never shows up in the
//! process list.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use s3putsecure_core::domain::newtypes::Passphrase;
use s3putsecure_core::domain::record::EncryptionMode;
use s3putsecure_core::ports::{EncryptionError, IEncryptionProvider};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Default executable name
pub const DEFAULT_GPG_PROGRAM: &str = "gpg";

/// Default limit for a single encryption
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// How gpg encrypts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpgMode {
    /// `--encrypt --recipient <recipient>`
    Asymmetric { recipient: String },
    /// `--symmetric` with the passphrase on stdin
    Symmetric { passphrase: Passphrase },
}

impl GpgMode {
    /// Maps the run's encryption mode; `None` when encryption is disabled
    pub fn from_encryption_mode(mode: &EncryptionMode) -> Option<Self> {
        match mode {
            EncryptionMode::None => None,
            EncryptionMode::Asymmetric { recipient } => Some(GpgMode::Asymmetric {
                recipient: recipient.clone(),
            }),
            EncryptionMode::Symmetric { passphrase } => Some(GpgMode::Symmetric {
                passphrase: passphrase.clone(),
            }),
        }
    }
}

/// [`IEncryptionProvider`] that shells out to GnuPG
#[derive(Debug, Clone)]
pub struct GpgEncryptor {
    program: String,
    mode: GpgMode,
    timeout: Duration,
}

impl GpgEncryptor {
    pub fn new(mode: GpgMode) -> Self {
        Self {
            program: DEFAULT_GPG_PROGRAM.to_string(),
            mode,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a different executable, e.g. `gpg2` or an absolute path
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Kill the tool if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the tool for one file
    pub fn command_args(&self, source: &Path, staging: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--batch".into(), "--yes".into()];
        match &self.mode {
            GpgMode::Asymmetric { recipient } => {
                args.push("--encrypt".into());
                args.push("--recipient".into());
                args.push(recipient.into());
            }
            GpgMode::Symmetric { .. } => {
                args.extend(
                    [
                        "--no-tty",
                        "--pinentry-mode",
                        "loopback",
                        "--passphrase-fd",
                        "0",
                        "--symmetric",
                    ]
                    .map(OsString::from),
                );
            }
        }
        args.push("--output".into());
        args.push(staging.into());
        args.push(source.into());
        args
    }

    /// Checks that the tool can be started and returns its version banner
    ///
    /// # Errors
    /// [`EncryptionError::Spawn`] if the program is missing,
    /// [`EncryptionError::Failed`] if `--version` exits unsuccessfully.
    pub async fn probe(&self) -> Result<String, EncryptionError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EncryptionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EncryptionError::Failed {
                path: self.program.clone().into(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().to_string())
    }
}

#[async_trait::async_trait]
impl IEncryptionProvider for GpgEncryptor {
    fn describe(&self) -> String {
        match &self.mode {
            GpgMode::Asymmetric { recipient } => format!("public-key for {recipient}"),
            GpgMode::Symmetric { .. } => "symmetric".to_string(),
        }
    }

    #[instrument(skip_all, fields(source = %source.display(), staging = %staging.display()))]
    async fn encrypt(&self, source: &Path, staging: &Path) -> Result<(), EncryptionError> {
        let passphrase = match &self.mode {
            GpgMode::Symmetric { passphrase } => Some(passphrase),
            GpgMode::Asymmetric { .. } => None,
        };

        let mut child = Command::new(&self.program)
            .args(self.command_args(source, staging))
            .stdin(if passphrase.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EncryptionError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        debug!(program = %self.program, "encryption started");

        let run = async {
            if let (Some(passphrase), Some(mut stdin)) = (passphrase, child.stdin.take()) {
                let written = async {
                    stdin.write_all(passphrase.expose().as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.shutdown().await
                }
                .await;
                // A tool that exits early closes the pipe; its exit status tells why
                match written {
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(EncryptionError::Io {
                    path: source.to_path_buf(),
                    source: err,
                })
            }
            Err(_) => {
                return Err(EncryptionError::Timeout {
                    path: source.to_path_buf(),
                    timeout: self.timeout,
                })
            }
        };

        if !output.status.success() {
            return Err(EncryptionError::Failed {
                path: source.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!("encryption finished");
        Ok(())
    }
}
