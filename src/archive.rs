// src/archive.rs

//! Package archive container
//!
//! A package is a gzip-compressed tar holding the packaged tree plus the
//! reserved manifest entries. The engine only ever needs to store a named
//! entry, list entries, and read an entry's bytes; this module keeps the tar
//! details behind that surface.

use crate::compression;
use crate::error::{Error, Result};
use crate::filesystem::PkgPath;
use crate::hash::Checksum;
use crate::manifest::{CHECKSUMS_ENTRY, METADATA_ENTRY, Manifest, VERSION_ENTRY};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// File name suffix of built packages
pub const PACKAGE_SUFFIX: &str = ".dpk";

/// Default header mtime when SOURCE_DATE_EPOCH is unset (2024-01-01 00:00:00 UTC)
const DEFAULT_MTIME: u64 = 1704067200;

fn archive_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Archive(format!("{}: {}", context, e))
}

/// Streaming writer for a new package
pub struct ArchiveWriter {
    builder: tar::Builder<GzEncoder<File>>,
    output: PathBuf,
    mtime: u64,
}

impl ArchiveWriter {
    pub fn create(output: &Path) -> Result<Self> {
        let file = File::create(output).map_err(|e| Error::io(output, e))?;
        let encoder = GzEncoder::new(file, Compression::default());

        // Fixed timestamps keep identical trees producing identical archives
        let mtime = std::env::var("SOURCE_DATE_EPOCH")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MTIME);

        Ok(Self {
            builder: tar::Builder::new(encoder),
            output: output.to_path_buf(),
            mtime,
        })
    }

    fn header(&self, entry_type: tar::EntryType, mode: u32, size: u64) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(entry_type);
        header.set_mode(mode);
        header.set_size(size);
        header.set_mtime(self.mtime);
        header.set_cksum();
        header
    }

    pub fn add_directory(&mut self, path: &PkgPath) -> Result<()> {
        let mut header = self.header(tar::EntryType::Directory, 0o755, 0);
        self.builder
            .append_data(&mut header, path.archive_name(), io::empty())
            .map_err(|e| archive_err(&format!("adding directory {}", path), e))
    }

    /// Stream a file from disk into the archive
    pub fn add_file(&mut self, path: &PkgPath, source: &Path) -> Result<()> {
        let file = File::open(source).map_err(|e| Error::io(source, e))?;
        let metadata = file.metadata().map_err(|e| Error::io(source, e))?;
        let mode = file_mode(&metadata);

        let mut header = self.header(tar::EntryType::Regular, mode, metadata.len());
        self.builder
            .append_data(&mut header, path.archive_name(), file)
            .map_err(|e| archive_err(&format!("adding file {}", path), e))
    }

    /// Store an entry from memory
    pub fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let mut header = self.header(tar::EntryType::Regular, 0o644, data.len() as u64);
        self.builder
            .append_data(&mut header, format!("./{}", name), data)
            .map_err(|e| archive_err(&format!("adding entry {}", name), e))
    }

    /// Store the reserved manifest entries
    pub fn add_manifest(&mut self, manifest: &Manifest) -> Result<()> {
        self.add_bytes(CHECKSUMS_ENTRY, manifest.to_checksums_table().as_bytes())?;
        self.add_bytes(VERSION_ENTRY, manifest.to_version_record().as_bytes())?;
        if let Some(meta) = manifest.to_metadata_record() {
            self.add_bytes(METADATA_ENTRY, meta.as_bytes())?;
        }
        Ok(())
    }

    pub fn finish(self) -> Result<PathBuf> {
        let encoder = self
            .builder
            .into_inner()
            .map_err(|e| archive_err("finalizing tar", e))?;
        encoder
            .finish()
            .map_err(|e| archive_err("finalizing gzip", e))?;
        Ok(self.output)
    }
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> u32 {
    0o644
}

/// Write a package for `manifest`, reading entry content from `root`
pub fn write_package(output: &Path, root: &Path, manifest: &Manifest) -> Result<PathBuf> {
    let mut writer = ArchiveWriter::create(output)?;

    for entry in manifest.entries() {
        match entry.checksum {
            Checksum::Directory => writer.add_directory(&entry.path)?,
            Checksum::Digest(_) => writer.add_file(&entry.path, &entry.path.to_fs_path(root))?,
        }
    }
    writer.add_manifest(manifest)?;

    let output = writer.finish()?;
    info!(
        "Wrote {} {} ({} entries) to {}",
        manifest.package_name,
        manifest.version,
        manifest.len(),
        output.display()
    );
    Ok(output)
}

/// A stored archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEntry {
    Directory,
    File { data: Vec<u8>, mode: u32 },
}

/// A package read into memory
#[derive(Debug, Clone)]
pub struct PackageArchive {
    source: String,
    entries: BTreeMap<PkgPath, ArchiveEntry>,
}

impl PackageArchive {
    /// Open a package file from disk
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Read a package from any byte stream, decompressing as needed
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self> {
        let (codec, decoder) = compression::open_stream(reader, source)?;
        debug!("Reading {} archive from {}", codec, source);

        let mut archive = tar::Archive::new(decoder);
        let mut entries = BTreeMap::new();

        for entry in archive.entries().map_err(|e| archive_err(source, e))? {
            let mut entry = entry.map_err(|e| archive_err(source, e))?;
            let raw = entry
                .path()
                .map_err(|e| archive_err(source, e))?
                .into_owned();

            if raw.components().all(|c| matches!(c, Component::CurDir)) {
                continue;
            }
            if raw.is_absolute() {
                return Err(Error::InvalidPath(format!(
                    "absolute entry name in {}: {}",
                    source,
                    raw.display()
                )));
            }
            let path = PkgPath::from_relative(&raw)?;

            let entry_type = entry.header().entry_type();
            let stored = if entry_type.is_dir() {
                ArchiveEntry::Directory
            } else if entry_type.is_file() {
                let mode = entry.header().mode().unwrap_or(0o644);
                let mut data = Vec::new();
                entry
                    .read_to_end(&mut data)
                    .map_err(|e| archive_err(&format!("reading {}", path), e))?;
                ArchiveEntry::File { data, mode }
            } else {
                debug!("Skipping unsupported entry type for {}", path);
                continue;
            };
            entries.insert(path, stored);
        }

        Ok(Self {
            source: source.to_string(),
            entries,
        })
    }

    /// Where this archive was read from, for messages
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every entry name, reserved ones included
    pub fn entry_names(&self) -> impl Iterator<Item = &PkgPath> {
        self.entries.keys()
    }

    /// Entries that are package content
    pub fn content(&self) -> impl Iterator<Item = (&PkgPath, &ArchiveEntry)> {
        self.entries.iter().filter(|(p, _)| !p.is_reserved())
    }

    pub fn get(&self, path: &PkgPath) -> Option<&ArchiveEntry> {
        self.entries.get(path)
    }

    /// Bytes of a file entry
    pub fn read(&self, path: &PkgPath) -> Option<&[u8]> {
        match self.entries.get(path) {
            Some(ArchiveEntry::File { data, .. }) => Some(data),
            _ => None,
        }
    }

    pub fn is_directory(&self, path: &PkgPath) -> bool {
        matches!(self.entries.get(path), Some(ArchiveEntry::Directory))
    }

    fn read_reserved(&self, name: &str) -> Result<Option<&str>> {
        let path = PkgPath::parse(name)?;
        match self.read(&path) {
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|_| Error::CorruptManifest(format!("{} in {} is not UTF-8", name, self.source))),
            None => Ok(None),
        }
    }

    /// Resolve the manifest stored in this archive
    pub fn manifest(&self) -> Result<Manifest> {
        let checksums = self.read_reserved(CHECKSUMS_ENTRY)?;
        let version = self.read_reserved(VERSION_ENTRY)?;
        let (Some(checksums), Some(version)) = (checksums, version) else {
            return Err(Error::MissingManifest(PathBuf::from(&self.source)));
        };
        Manifest::from_records(checksums, version, self.read_reserved(METADATA_ENTRY)?)
    }
}
