// src/state.rs

//! Installed state of a target directory
//!
//! After an install the reserved manifest files sit at the top of the target
//! directory and record what the directory believes it contains.

use crate::error::{Error, Result};
use crate::filesystem::PkgPath;
use crate::hash::Checksum;
use crate::manifest::{
    self, CHECKSUMS_ENTRY, METADATA_ENTRY, Manifest, RESERVED_ENTRIES, VERSION_ENTRY,
};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whatever part of an Installed State is present in a directory
#[derive(Debug, Clone, Default)]
pub struct InstalledState {
    /// `(name, version)` from the version record
    pub version: Option<(String, String)>,
    /// The recorded checksums table
    pub checksums: Option<BTreeMap<PkgPath, Checksum>>,
    /// Raw metadata record text
    pub metadata: Option<String>,
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

impl InstalledState {
    /// Read the reserved files of `target`
    ///
    /// Returns `None` when neither a version record nor a checksums table
    /// exists there.
    pub fn load(target: &Path) -> Result<Option<Self>> {
        let version = read_optional(&target.join(VERSION_ENTRY))?
            .map(|text| manifest::parse_version_record(&text))
            .transpose()?;
        let checksums = read_optional(&target.join(CHECKSUMS_ENTRY))?
            .map(|text| manifest::parse_checksums_table(&text))
            .transpose()?;

        if version.is_none() && checksums.is_none() {
            debug!("No installed state in {}", target.display());
            return Ok(None);
        }

        let metadata = read_optional(&target.join(METADATA_ENTRY))?;
        Ok(Some(Self {
            version,
            checksums,
            metadata,
        }))
    }

    /// Installed package name, if a version record exists
    pub fn package_name(&self) -> Option<&str> {
        self.version.as_ref().map(|(name, _)| name.as_str())
    }

    /// The full manifest; requires both the version record and checksums
    pub fn manifest(&self, target: &Path) -> Result<Manifest> {
        let (Some((name, version)), Some(checksums)) = (&self.version, &self.checksums) else {
            return Err(Error::MissingManifest(target.to_path_buf()));
        };

        let mut manifest = Manifest::new(name.clone(), version.clone())?;
        for (path, checksum) in checksums {
            manifest.insert(path.clone(), checksum.clone());
        }
        if let Some(meta) = &self.metadata {
            manifest.metadata = manifest::parse_metadata_record(meta);
        }
        Ok(manifest)
    }

    pub fn recorded(&self, path: &PkgPath) -> Option<&Checksum> {
        self.checksums.as_ref().and_then(|c| c.get(path))
    }
}

/// Write `manifest` as the Installed State of `target`
///
/// A stale metadata record is removed when the new manifest has none.
pub fn write(target: &Path, manifest: &Manifest) -> Result<()> {
    let sums = target.join(CHECKSUMS_ENTRY);
    fs::write(&sums, manifest.to_checksums_table()).map_err(|e| Error::io(&sums, e))?;

    let version = target.join(VERSION_ENTRY);
    fs::write(&version, manifest.to_version_record()).map_err(|e| Error::io(&version, e))?;

    let meta = target.join(METADATA_ENTRY);
    match manifest.to_metadata_record() {
        Some(text) => fs::write(&meta, text).map_err(|e| Error::io(&meta, e))?,
        None => match fs::remove_file(&meta) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(&meta, e)),
        },
    }
    Ok(())
}

/// On-disk locations of the reserved files in `target`
pub fn reserved_paths(target: &Path) -> Vec<PathBuf> {
    RESERVED_ENTRIES.iter().map(|name| target.join(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Field;
    use tempfile::TempDir;

    fn sample() -> Manifest {
        let mut manifest = Manifest::new("tool", "1.2").unwrap();
        manifest.insert(PkgPath::parse("bin").unwrap(), Checksum::Directory);
        manifest.metadata.insert(Field::Author, "A".to_string());
        manifest
    }

    #[test]
    fn test_load_absent() {
        let temp_dir = TempDir::new().unwrap();
        assert!(InstalledState::load(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), &sample()).unwrap();

        let state = InstalledState::load(temp_dir.path()).unwrap().unwrap();
        assert_eq!(state.package_name(), Some("tool"));
        assert_eq!(
            state.recorded(&PkgPath::parse("bin").unwrap()),
            Some(&Checksum::Directory)
        );
        assert_eq!(state.manifest(temp_dir.path()).unwrap(), sample());
    }

    #[test]
    fn test_partial_state() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(VERSION_ENTRY), "tool 1\n").unwrap();

        let state = InstalledState::load(temp_dir.path()).unwrap().unwrap();
        assert_eq!(state.package_name(), Some("tool"));
        assert!(state.checksums.is_none());
        assert!(matches!(
            state.manifest(temp_dir.path()),
            Err(Error::MissingManifest(_))
        ));
    }

    #[test]
    fn test_write_drops_stale_metadata() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), &sample()).unwrap();
        assert!(temp_dir.path().join(METADATA_ENTRY).exists());

        let bare = Manifest::new("tool", "1.3").unwrap();
        write(temp_dir.path(), &bare).unwrap();
        assert!(!temp_dir.path().join(METADATA_ENTRY).exists());
        assert_eq!(reserved_paths(temp_dir.path()).len(), 3);
    }
}
