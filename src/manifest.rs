// src/manifest.rs

//! Package manifests
//!
//! A manifest is what a package says it contains: its name and version,
//! free-form metadata, and a path to checksum table. It is persisted as three
//! reserved text entries, both inside package archives and inside target
//! directories after an install:
//!
//! - `.driftpack-sums`: one `"<digest|DIR> <path>"` line per entry
//! - `.driftpack-version`: `"<name> <version>"`
//! - `.driftpack-meta`: `"<Field>: <value>"` lines, only when metadata is set

use crate::collect::{EntryKind, FileSet};
use crate::error::{Error, Result};
use crate::filesystem::PkgPath;
use crate::hash::{self, Checksum, HashAlgorithm};
use crate::spec::{ConfigFields, Field};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// Reserved entry holding the checksums table
pub const CHECKSUMS_ENTRY: &str = ".driftpack-sums";
/// Reserved entry holding the version record
pub const VERSION_ENTRY: &str = ".driftpack-version";
/// Reserved entry holding the optional metadata record
pub const METADATA_ENTRY: &str = ".driftpack-meta";

/// All reserved entry names, never shown as package content
pub const RESERVED_ENTRIES: [&str; 3] = [CHECKSUMS_ENTRY, VERSION_ENTRY, METADATA_ENTRY];

/// One row of a checksums table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PkgPath,
    pub checksum: Checksum,
}

/// Where packaged sources came from, recorded in read-only metadata fields
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    /// Build timestamp, RFC 3339
    pub built: Option<String>,
    /// VCS kind the sources were checked out with
    pub vcs: Option<String>,
}

/// An in-memory package manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub package_name: String,
    pub version: String,
    pub metadata: BTreeMap<Field, String>,
    entries: BTreeMap<PkgPath, Checksum>,
}

impl Manifest {
    /// Create an empty manifest; fails if name or version is empty
    pub fn new(package_name: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let package_name = package_name.into();
        let version = version.into();
        if package_name.trim().is_empty() {
            return Err(Error::EmptyField("package name"));
        }
        if version.trim().is_empty() {
            return Err(Error::EmptyField("version"));
        }
        if package_name.chars().any(char::is_whitespace) || version.chars().any(char::is_whitespace) {
            return Err(Error::CorruptManifest(format!(
                "name and version must not contain whitespace: '{} {}'",
                package_name, version
            )));
        }
        Ok(Self {
            package_name,
            version,
            metadata: BTreeMap::new(),
            entries: BTreeMap::new(),
        })
    }

    /// Fingerprint every collected path under `root` and record it
    ///
    /// Only recorded (metadata) fields are copied from `fields`; packaging
    /// directives stay out of the manifest.
    pub fn build(
        root: &Path,
        files: &FileSet,
        package_name: &str,
        version: &str,
        fields: &ConfigFields,
        provenance: &Provenance,
        algorithm: HashAlgorithm,
    ) -> Result<Self> {
        let mut manifest = Self::new(package_name, version)?;

        for (path, kind) in files.iter() {
            let checksum = match kind {
                EntryKind::Directory => Checksum::Directory,
                EntryKind::File => hash::checksum(&path.to_fs_path(root), algorithm)?,
            };
            debug!("{} {}", checksum, path);
            manifest.insert(path.clone(), checksum);
        }

        for (field, value) in fields {
            if field.is_recorded() && !field.is_read_only() && !value.is_empty() {
                manifest.metadata.insert(*field, value.clone());
            }
        }
        if let Some(built) = &provenance.built {
            manifest.metadata.insert(Field::Built, built.clone());
        }
        if let Some(vcs) = &provenance.vcs {
            manifest.metadata.insert(Field::Vcs, vcs.clone());
        }

        Ok(manifest)
    }

    /// Record a path; reserved names are refused silently
    pub fn insert(&mut self, path: PkgPath, checksum: Checksum) {
        if path.is_reserved() {
            debug!("Refusing reserved entry {} as package content", path);
            return;
        }
        self.entries.insert(path, checksum);
    }

    pub fn lookup(&self, path: &PkgPath) -> Option<&Checksum> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &PkgPath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in lexicographic path order
    pub fn entries(&self) -> impl Iterator<Item = FileEntry> + '_ {
        self.entries.iter().map(|(path, checksum)| FileEntry {
            path: path.clone(),
            checksum: checksum.clone(),
        })
    }

    /// User-visible paths in lexicographic order
    pub fn paths(&self) -> impl Iterator<Item = &PkgPath> {
        self.entries.keys()
    }

    pub fn meta(&self, field: Field) -> Option<&str> {
        self.metadata.get(&field).map(String::as_str)
    }

    pub fn to_checksums_table(&self) -> String {
        let mut out = String::new();
        for (path, checksum) in &self.entries {
            let _ = writeln!(out, "{} {}", checksum, path);
        }
        out
    }

    pub fn to_version_record(&self) -> String {
        format!("{} {}\n", self.package_name, self.version)
    }

    /// The metadata record, or `None` when no field is set
    pub fn to_metadata_record(&self) -> Option<String> {
        if self.metadata.is_empty() {
            return None;
        }
        let mut out = String::new();
        for (field, value) in &self.metadata {
            let _ = writeln!(out, "{}: {}", field, value);
        }
        Some(out)
    }

    /// Reassemble a manifest from its three serialized records
    pub fn from_records(checksums: &str, version: &str, metadata: Option<&str>) -> Result<Self> {
        let (name, ver) = parse_version_record(version)?;
        let mut manifest = Self::new(name, ver)?;
        manifest.entries = parse_checksums_table(checksums)?;
        if let Some(text) = metadata {
            manifest.metadata = parse_metadata_record(text);
        }
        Ok(manifest)
    }
}

/// Parse `"<name> <version>"`
pub fn parse_version_record(text: &str) -> Result<(String, String)> {
    let line = text.lines().next().unwrap_or("").trim();
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(name), Some(version)) => Ok((name.to_string(), version.to_string())),
        _ => Err(Error::CorruptManifest(format!(
            "version record must be '<name> <version>', got '{}'",
            line
        ))),
    }
}

/// Parse a checksums table; the path is everything after the first run of
/// whitespace, so paths may contain spaces
pub fn parse_checksums_table(text: &str) -> Result<BTreeMap<PkgPath, Checksum>> {
    let mut entries = BTreeMap::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (digest, path) = line
            .split_once(char::is_whitespace)
            .map(|(d, p)| (d, p.trim_start()))
            .filter(|(_, p)| !p.is_empty())
            .ok_or_else(|| {
                Error::CorruptManifest(format!("checksums line {}: missing path in '{}'", idx + 1, line))
            })?;

        let checksum: Checksum = digest.parse().map_err(|_| {
            Error::CorruptManifest(format!("checksums line {}: bad digest '{}'", idx + 1, digest))
        })?;
        let path = PkgPath::parse(path).map_err(|e| {
            Error::CorruptManifest(format!("checksums line {}: {}", idx + 1, e))
        })?;

        if !path.is_reserved() {
            entries.insert(path, checksum);
        }
    }

    Ok(entries)
}

/// Parse `"<Field>: <value>"` lines; unknown fields are skipped
pub fn parse_metadata_record(text: &str) -> BTreeMap<Field, String> {
    let mut metadata = BTreeMap::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match Field::lookup(key.trim()) {
            Some(field) if field.is_recorded() => {
                metadata.insert(field, value.trim().to_string());
            }
            _ => debug!("Skipping metadata line '{}'", line),
        }
    }
    metadata
}
