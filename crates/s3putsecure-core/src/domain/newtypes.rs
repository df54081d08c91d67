//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::DomainError;

// ============================================================================
// Path types
// ============================================================================

/// The normalized root of the local tree being mirrored
///
/// Normalization is purely lexical (the directory does not need to exist):
/// trailing and duplicate separators and `.` components are dropped and
/// `name/..` pairs are collapsed. A leading `..` on a relative path is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct SourceRoot(PathBuf);

impl SourceRoot {
    /// Create a new SourceRoot from a user-supplied path
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is empty or escapes
    /// the filesystem root via `..`
    pub fn new(path: PathBuf) -> Result<Self, DomainError> {
        if path.as_os_str().is_empty() {
            return Err(DomainError::InvalidPath(
                "Source path cannot be empty".to_string(),
            ));
        }
        Ok(Self(Self::normalize_path(&path)?))
    }

    /// Get the inner path reference
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    fn normalize_path(path: &Path) -> Result<PathBuf, DomainError> {
        let mut normalized = PathBuf::new();

        for component in path.components() {
            match component {
                Component::Prefix(p) => normalized.push(p.as_os_str()),
                Component::RootDir => normalized.push(component.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => match normalized.components().next_back() {
                    Some(Component::Normal(_)) => {
                        normalized.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {
                        return Err(DomainError::InvalidPath(format!(
                            "Path escapes filesystem root via ..: {}",
                            path.display()
                        )));
                    }
                    _ => normalized.push(".."),
                },
                Component::Normal(c) => normalized.push(c),
            }
        }

        if normalized.as_os_str().is_empty() {
            normalized.push(".");
        }

        Ok(normalized)
    }
}

impl Display for SourceRoot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl TryFrom<PathBuf> for SourceRoot {
    type Error = DomainError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<SourceRoot> for PathBuf {
    fn from(root: SourceRoot) -> Self {
        root.0
    }
}

impl AsRef<Path> for SourceRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Identifier of a file in the remote store
///
/// A logical key is the path of a file relative to the source root,
/// with components joined by `/` regardless of platform. It never starts
/// with a separator and never contains empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalKey(String);

impl LogicalKey {
    /// Create a LogicalKey from an already-formed key string
    ///
    /// # Errors
    /// Returns error if the key is empty, absolute, or has invalid segments
    pub fn new(key: String) -> Result<Self, DomainError> {
        if key.is_empty() {
            return Err(DomainError::InvalidKey("Key cannot be empty".to_string()));
        }
        if key.starts_with('/') {
            return Err(DomainError::InvalidKey(format!(
                "Key must be relative: {key}"
            )));
        }
        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(DomainError::InvalidKey(format!(
                "Key contains an empty or relative segment: {key}"
            )));
        }
        Ok(Self(key))
    }

    /// Derive the key of `path` by stripping `root` and its separator
    ///
    /// # Errors
    /// Returns `PathNotInSourceRoot` if `path` is not below `root`, and
    /// `InvalidKey` if a component is not valid UTF-8
    pub fn from_paths(root: &SourceRoot, path: &Path) -> Result<Self, DomainError> {
        let relative = path.strip_prefix(root.as_path()).map_err(|_| {
            DomainError::PathNotInSourceRoot(format!(
                "{} is not within {}",
                path.display(),
                root
            ))
        })?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(c) => {
                    let segment = c.to_str().ok_or_else(|| {
                        DomainError::InvalidKey(format!(
                            "Non UTF-8 path component in {}",
                            path.display()
                        ))
                    })?;
                    segments.push(segment);
                }
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidKey(format!(
                        "Unexpected component in {}",
                        path.display()
                    )))
                }
            }
        }

        Self::new(segments.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key rewritten to a single filesystem-safe name
    ///
    /// Every character outside `[A-Za-z0-9._-]` becomes `_`, so
    /// `docs/a b.txt` maps to `docs_a_b.txt`.
    #[must_use]
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl Display for LogicalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for LogicalKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LogicalKey> for String {
    fn from(key: LogicalKey) -> Self {
        key.0
    }
}

// ============================================================================
// Content digest
// ============================================================================

/// MD5 fingerprint of a file's plaintext, as 32 lowercase hex characters
///
/// The digest only detects change; it is not used for any security
/// decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Length of the hex encoding of a 16-byte MD5 digest
    const HEX_LEN: usize = 32;

    /// Create a new ContentDigest
    ///
    /// # Errors
    /// Returns error if the string is not 32 lowercase hex characters
    pub fn new(digest: String) -> Result<Self, DomainError> {
        if digest.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidDigest(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                digest.len()
            )));
        }
        if !digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DomainError::InvalidDigest(format!(
                "not lowercase hex: {digest}"
            )));
        }
        Ok(Self(digest))
    }

    /// Build a digest from raw digest bytes
    ///
    /// # Errors
    /// Returns error if `bytes` is not 16 bytes long
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DomainError> {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self::new(hex)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentDigest {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.0
    }
}

// ============================================================================
// Bucket name
// ============================================================================

/// Name of the target bucket
///
/// Validation is deliberately loose so that legacy bucket names keep
/// working: 3 to 255 characters from `[A-Za-z0-9._-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketName(String);

impl BucketName {
    /// Create a new BucketName
    ///
    /// # Errors
    /// Returns error if the name has the wrong length or invalid characters
    pub fn new(name: String) -> Result<Self, DomainError> {
        if name.len() < 3 || name.len() > 255 {
            return Err(DomainError::InvalidBucket(format!(
                "{name} (must be 3 to 255 characters)"
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(DomainError::InvalidBucket(format!(
                "{name} (allowed characters: letters, digits, '.', '_', '-')"
            )));
        }
        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BucketName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BucketName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for BucketName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BucketName> for String {
    fn from(name: BucketName) -> Self {
        name.0
    }
}

// ============================================================================
// Passphrase
// ============================================================================

/// Symmetric encryption passphrase
///
/// The value is wiped from memory on drop and never shown by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a passphrase
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    /// Borrow the secret value
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}
