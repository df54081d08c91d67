//! Content digest of local files
//!
//! The digest identifies plaintext content for change detection only. It is
//! an MD5 over the full byte stream, streamed in fixed-size chunks so large
//! files are never held in memory. Name, permissions and timestamps do not
//! participate.

use std::io;
use std::path::Path;

use md5::{Digest, Md5};
use s3putsecure_core::domain::newtypes::ContentDigest;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};

/// Read buffer size for hashing
const BUFFER_SIZE: usize = 64 * 1024;

/// Digest and byte count of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Hex MD5 of the content
    pub digest: ContentDigest,
    /// Number of bytes hashed
    pub size: u64,
}

/// Computes the MD5 digest of the file at `path`
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened or read, e.g. when it
/// vanished after the directory listing.
#[instrument(fields(path = %path.display()))]
pub async fn compute_digest(path: &Path) -> io::Result<FileDigest> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut size = 0u64;

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        size += n as u64;
    }

    let digest = ContentDigest::from_bytes(hasher.finalize().as_slice())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    debug!(%digest, size, "digest computed");

    Ok(FileDigest { digest, size })
}
