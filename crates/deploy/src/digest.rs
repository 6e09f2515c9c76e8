//! Streaming SHA-1 digests of local files.

use std::io::Read;
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::error::UploadError;

/// A file's content digest and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Hex-encoded SHA-1. Netlify manifests identify content by SHA-1,
    /// and the site file listing returns hex, so hex is the encoding
    /// that round-trips through a manifest merge.
    pub sha1: String,
    /// Size in bytes, accumulated during the same pass.
    pub size: u64,
}

/// Hashes `path` in a single streaming pass.
pub fn digest_file(path: &Path) -> Result<FileDigest, UploadError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 8192];
    let mut size: u64 = 0;

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok(FileDigest {
        sha1: hex::encode(hasher.finalize()),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn digest_known_vector() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, b"hello, world!").unwrap();

        let digest = digest_file(&path).unwrap();
        assert_eq!(digest.sha1, "1f09d30c707d53f3d16c530dd73d70a6ce7596a9");
        assert_eq!(digest.size, 13);
    }

    #[test]
    fn digest_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        std::fs::write(&path, vec![7u8; 100_000]).unwrap();

        let first = digest_file(&path).unwrap();
        let second = digest_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.size, 100_000);
    }

    #[test]
    fn digest_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        let digest = digest_file(&path).unwrap();
        // SHA-1 of the empty string.
        assert_eq!(digest.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(digest.size, 0);
    }

    #[test]
    fn digest_missing_file() {
        let result = digest_file(Path::new("/nonexistent/source.bin"));
        assert!(matches!(result, Err(UploadError::Io(_))));
    }
}
