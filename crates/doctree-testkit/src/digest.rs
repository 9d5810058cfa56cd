//! Content digests for byte-identity checks.
//!
//! Comparing digests instead of whole buffers keeps assertion output short
//! when large payloads differ.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Digest of an in-memory payload.
pub fn content_digest(bytes: &[u8]) -> blake3::Hash {
    blake3::hash(bytes)
}

/// Digest of everything `reader` yields.
pub fn stream_digest(mut reader: impl Read) -> io::Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 16 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Digest of a file's contents.
pub fn file_digest(path: impl AsRef<Path>) -> io::Result<blake3::Hash> {
    stream_digest(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_matches_content() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i * 7) as u8).collect();
        assert_eq!(stream_digest(&data[..]).unwrap(), content_digest(&data));
    }

    #[test]
    fn test_file_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(file_digest(&path).unwrap(), content_digest(b"abc"));
    }
}
