// src/hash.rs

//! Content fingerprints for package entries
//!
//! Every path in a checksums table carries either a hex content digest or the
//! directory sentinel `DIR`. Two algorithms are supported:
//!
//! | Algorithm | Digest | Use |
//! |-----------|--------|-----|
//! | SHA-256 | 64 hex chars | default for new packages |
//! | MD5 | 32 hex chars | legacy checksums tables |
//!
//! A recorded digest's algorithm is recovered from its length, so a table
//! written with either algorithm can be verified against live files.

use crate::error::{Error, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Literal written in place of a digest for directory entries
pub const DIR_SENTINEL: &str = "DIR";

/// Read buffer used when streaming file content through a hasher
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-256 (256-bit)
    #[default]
    Sha256,
    /// MD5 (128-bit), kept for tables produced by older packagers
    Md5,
}

impl HashAlgorithm {
    /// Hex digest length
    #[inline]
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Md5 => 32,
        }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
        }
    }

    /// Infer the algorithm from a hex digest's length
    pub fn for_digest(digest: &str) -> Option<Self> {
        match digest.len() {
            64 => Some(Self::Sha256),
            32 => Some(Self::Md5),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "md5" => Ok(Self::Md5),
            _ => Err(Error::Config(format!("unknown hash algorithm: {}", s))),
        }
    }
}

/// Incremental hasher over either algorithm
pub struct Hasher {
    state: HasherState,
}

enum HasherState {
    Sha256(Sha256),
    Md5(Md5),
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Md5 => HasherState::Md5(Md5::new()),
        };
        Self { state }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha256(hasher) => hasher.update(data),
            HasherState::Md5(hasher) => hasher.update(data),
        }
    }

    /// Finalize into a lowercase hex digest
    pub fn finalize(self) -> String {
        match self.state {
            HasherState::Sha256(hasher) => format!("{:x}", hasher.finalize()),
            HasherState::Md5(hasher) => format!("{:x}", hasher.finalize()),
        }
    }
}

/// Hash a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Hash everything a reader yields, in fixed-size chunks
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<String> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// A checksums table value: a content digest or the directory sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Checksum {
    Directory,
    Digest(String),
}

impl Checksum {
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Algorithm that produced this digest, `None` for directories
    pub fn algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            Self::Directory => None,
            Self::Digest(d) => HashAlgorithm::for_digest(d),
        }
    }

    /// Does the live path at `path` carry this checksum?
    ///
    /// The live side is hashed with whichever algorithm produced the recorded
    /// digest.
    pub fn matches_path(&self, path: &Path) -> Result<bool> {
        let algorithm = self.algorithm().unwrap_or_default();
        Ok(checksum(path, algorithm)? == *self)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => f.write_str(DIR_SENTINEL),
            Self::Digest(d) => f.write_str(d),
        }
    }
}

impl FromStr for Checksum {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == DIR_SENTINEL {
            return Ok(Self::Directory);
        }
        if HashAlgorithm::for_digest(s).is_none() || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::CorruptManifest(format!("invalid checksum '{}'", s)));
        }
        Ok(Self::Digest(s.to_lowercase()))
    }
}

/// Fingerprint a live path
///
/// Directories return [`Checksum::Directory`] without reading anything.
/// Files are streamed, so size is not a concern. A symbolic link is never
/// followed: it is fingerprinted as `symlink:<target>`, so it never matches
/// a recorded file or directory, even when dangling.
pub fn checksum(path: &Path, algorithm: HashAlgorithm) -> Result<Checksum> {
    let metadata = std::fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path).map_err(|e| Error::io(path, e))?;
        let marker = format!("symlink:{}", target.display());
        return Ok(Checksum::Digest(hash_bytes(algorithm, marker.as_bytes())));
    }
    if metadata.is_dir() {
        return Ok(Checksum::Directory);
    }

    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let digest = hash_reader(algorithm, &mut file).map_err(|e| Error::io(path, e))?;
    Ok(Checksum::Digest(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            hash_bytes(HashAlgorithm::Sha256, b"Hello, World!"),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_md5_known_value() {
        assert_eq!(
            hash_bytes(HashAlgorithm::Md5, b"hello"),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn test_hasher_incremental() {
        let full = hash_bytes(HashAlgorithm::Sha256, b"Hello, World!");

        let mut hasher = Hasher::new(HashAlgorithm::Sha256);
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        assert_eq!(full, hasher.finalize());
    }

    #[test]
    fn test_hash_reader_spans_buffers() {
        let data = vec![7u8; HASH_BUFFER_SIZE * 3 + 11];
        let mut cursor = io::Cursor::new(&data);
        let streamed = hash_reader(HashAlgorithm::Sha256, &mut cursor).unwrap();
        assert_eq!(streamed, hash_bytes(HashAlgorithm::Sha256, &data));
    }

    #[test]
    fn test_checksum_directory_sentinel() {
        let temp_dir = TempDir::new().unwrap();
        let sum = checksum(temp_dir.path(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(sum, Checksum::Directory);
        assert_eq!(sum.to_string(), "DIR");
    }

    #[test]
    fn test_checksum_file_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let sum = checksum(&path, HashAlgorithm::Md5).unwrap();
        assert_eq!(
            sum,
            Checksum::Digest("5d41402abc4b2a76b9719d911017c592".to_string())
        );
        assert!(sum.matches_path(&path).unwrap());

        let missing = checksum(&temp_dir.path().join("nope"), HashAlgorithm::Sha256);
        assert!(matches!(missing, Err(Error::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_checksum_does_not_follow_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();
        let dir_link = temp_dir.path().join("dir-link");
        let file_link = temp_dir.path().join("file-link");
        let dangling = temp_dir.path().join("dangling");
        std::os::unix::fs::symlink(temp_dir.path(), &dir_link).unwrap();
        std::os::unix::fs::symlink(&file, &file_link).unwrap();
        std::os::unix::fs::symlink("missing", &dangling).unwrap();

        assert_ne!(checksum(&dir_link, HashAlgorithm::Sha256).unwrap(), Checksum::Directory);
        let recorded = checksum(&file, HashAlgorithm::Sha256).unwrap();
        assert!(!recorded.matches_path(&file_link).unwrap());
        assert!(!recorded.matches_path(&dangling).unwrap());
        assert_eq!(
            checksum(&dangling, HashAlgorithm::Sha256).unwrap(),
            Checksum::Digest(hash_bytes(HashAlgorithm::Sha256, b"symlink:missing"))
        );
    }

    #[test]
    fn test_checksum_parse() {
        assert_eq!("DIR".parse::<Checksum>().unwrap(), Checksum::Directory);
        let upper = "5D41402ABC4B2A76B9719D911017C592".parse::<Checksum>().unwrap();
        assert_eq!(upper.to_string(), "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(upper.algorithm(), Some(HashAlgorithm::Md5));
        assert!("abc".parse::<Checksum>().is_err());
        assert!("zz41402abc4b2a76b9719d911017c592".parse::<Checksum>().is_err());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }
}
