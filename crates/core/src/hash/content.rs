//! Streaming whole-file fingerprints (spec.md §4.4).
//!
//! `fast64` is `xxhash-rust`'s XXH3-64 (pulled in from
//! `examples/DevsHero-NeuroSiphon/Cargo.toml`, which already reaches for
//! it as "Deterministic content hashing... non-cryptographic but
//! collision-resistant"). `sha256` is `sha2`, the teacher's own content
//! hash (`services::file_index`'s `file_content_hashes` table), kept as
//! the optional cryptographic algorithm spec.md §4.4 allows registering.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

const BUFFER_SIZE: usize = 64 * 1024;

/// Contract for a whole-file fingerprint algorithm.
pub trait ContentHasher: Send + Sync {
    fn name(&self) -> &str;
    /// Hash `path`'s contents, streaming through a fixed buffer.
    fn fast64(&self, path: &Path) -> Result<String>;
}

pub struct Fast64Hasher;

impl ContentHasher for Fast64Hasher {
    fn name(&self) -> &str {
        "fast64"
    }

    fn fast64(&self, path: &Path) -> Result<String> {
        let mut hasher = Xxh3::new();
        stream_into(path, |chunk| hasher.update(chunk))?;
        Ok(format!("{:016x}", hasher.digest()))
    }
}

pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn name(&self) -> &str {
        "sha256"
    }

    fn fast64(&self, path: &Path) -> Result<String> {
        let mut hasher = Sha256::new();
        stream_into(path, |chunk| hasher.update(chunk))?;
        Ok(hex_lower(&hasher.finalize()))
    }
}

fn stream_into(path: &Path, mut feed: impl FnMut(&[u8])) -> Result<()> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buf = [0u8; BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        feed(&buf[..n]);
    }
    Ok(())
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn fast64_is_deterministic_and_sensitive_to_content() {
        let mut a = NamedTempFile::new().unwrap();
        a.write_all(b"hi").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        b.write_all(b"hi").unwrap();
        let mut c = NamedTempFile::new().unwrap();
        c.write_all(b"bye").unwrap();

        let hasher = Fast64Hasher;
        let ha = hasher.fast64(a.path()).unwrap();
        let hb = hasher.fast64(b.path()).unwrap();
        let hc = hasher.fast64(c.path()).unwrap();

        assert_eq!(ha, hb);
        assert_ne!(ha, hc);
        assert_eq!(ha, ha.to_lowercase());
    }

    #[test]
    fn sha256_is_64_lowercase_hex_chars_and_deterministic() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello").unwrap();
        let hasher = Sha256Hasher;
        let h1 = hasher.fast64(f.path()).unwrap();
        let h2 = hasher.fast64(f.path()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }
}
