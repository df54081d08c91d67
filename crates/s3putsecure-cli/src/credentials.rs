//! Credential and secret resolution
//!
//! Access keys come from the command line first, then from the
//! environment (`AWS_ACCESS_KEY` / `AWS_SECRET_KEY`, then the standard
//! `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`). The symmetric passphrase
//! may come from `S3PUTSECURE_PASSPHRASE` when it is not given as an
//! argument.
//!
//! Environment access goes through a lookup function so resolution can be
//! tested without touching the process environment.

use s3putsecure_core::domain::newtypes::Passphrase;
use s3putsecure_core::domain::record::EncryptionMode;
use s3putsecure_s3::AccessKeys;
use thiserror::Error;

pub const ACCESS_KEY_VARS: [&str; 2] = ["AWS_ACCESS_KEY", "AWS_ACCESS_KEY_ID"];
pub const SECRET_KEY_VARS: [&str; 2] = ["AWS_SECRET_KEY", "AWS_SECRET_ACCESS_KEY"];
pub const PASSPHRASE_VAR: &str = "S3PUTSECURE_PASSPHRASE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No access key given (use --access-key or set AWS_ACCESS_KEY)")]
    MissingAccessKey,

    #[error("No secret key given (use --secret-key or set AWS_SECRET_KEY)")]
    MissingSecretKey,

    #[error("A GnuPG recipient is required unless --no-encrypt is given")]
    MissingRecipient,

    #[error("A passphrase is required with --symmetric (argument or {PASSPHRASE_VAR})")]
    MissingPassphrase,
}

impl CredentialError {
    /// Missing positional arguments are usage errors
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            CredentialError::MissingRecipient | CredentialError::MissingPassphrase
        )
    }
}

/// Reads the process environment
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn first_set(
    flag: Option<&str>,
    vars: &[&str],
    env: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    flag.map(str::to_string)
        .into_iter()
        .chain(vars.iter().filter_map(|v| env(*v)))
        .find(|v| !v.is_empty())
}

/// Picks the access key pair
pub fn resolve_access_keys(
    access_key: Option<&str>,
    secret_key: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AccessKeys, CredentialError> {
    let id = first_set(access_key, &ACCESS_KEY_VARS, &env).ok_or(CredentialError::MissingAccessKey)?;
    let secret =
        first_set(secret_key, &SECRET_KEY_VARS, &env).ok_or(CredentialError::MissingSecretKey)?;
    Ok(AccessKeys::new(id, secret))
}

/// Derives the encryption mode from the flags and the third positional
/// argument
pub fn resolve_encryption(
    no_encrypt: bool,
    symmetric: bool,
    recipient_or_passphrase: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<EncryptionMode, CredentialError> {
    if no_encrypt {
        return Ok(EncryptionMode::None);
    }

    let given = recipient_or_passphrase.filter(|v| !v.is_empty());
    if symmetric {
        let passphrase = given
            .map(str::to_string)
            .or_else(|| env(PASSPHRASE_VAR).filter(|v| !v.is_empty()))
            .ok_or(CredentialError::MissingPassphrase)?;
        return Ok(EncryptionMode::Symmetric {
            passphrase: Passphrase::new(passphrase),
        });
    }

    let recipient = given.ok_or(CredentialError::MissingRecipient)?;
    Ok(EncryptionMode::Asymmetric {
        recipient: recipient.to_string(),
    })
}
