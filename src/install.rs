// src/install.rs

//! Conflict-aware installation of a package onto a target directory
//!
//! Validation completes before anything is written: a package-name mismatch
//! always aborts, and locally modified files abort unless forced. Files that
//! the new package no longer carries are left alone.

use crate::archive::{ArchiveEntry, PackageArchive};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::filesystem::{FileDeployer, PkgPath};
use crate::hash::Checksum;
use crate::manifest::Manifest;
use crate::state::{self, InstalledState};
use std::path::Path;
use tracing::{debug, info, warn};

/// What an install did
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub package_name: String,
    pub version: String,
    pub files: usize,
    pub directories: usize,
    /// Locally modified paths that `force` overwrote
    pub overridden: Vec<PkgPath>,
}

/// Paths whose live content differs from both the installed record and the
/// incoming package
pub fn find_conflicts(target: &Path, installed: &InstalledState, incoming: &Manifest) -> Result<Vec<PkgPath>> {
    let Some(recorded) = &installed.checksums else {
        return Ok(Vec::new());
    };

    let mut conflicts = Vec::new();
    for (path, checksum) in recorded {
        let live = path.to_fs_path(target);
        if std::fs::symlink_metadata(&live).is_err() {
            continue;
        }
        if checksum.matches_path(&live)? {
            continue;
        }
        // Already carries what we are about to install
        if let Some(new) = incoming.lookup(path)
            && new.matches_path(&live)?
        {
            continue;
        }
        debug!("Conflict: {} differs from its recorded checksum", path);
        conflicts.push(path.clone());
    }
    Ok(conflicts)
}

/// Install `archive` into `target`
pub fn install(archive: &PackageArchive, target: &Path, options: &Options) -> Result<InstallReport> {
    let manifest = archive.manifest()?;
    info!(
        "Installing {} {} into {}",
        manifest.package_name,
        manifest.version,
        target.display()
    );

    let installed = InstalledState::load(target)?;
    if let Some(installed) = &installed
        && let Some(name) = installed.package_name()
        && name != manifest.package_name
    {
        return Err(Error::NameMismatch {
            installed: name.to_string(),
            incoming: manifest.package_name.clone(),
        });
    }

    let conflicts = match &installed {
        Some(installed) => find_conflicts(target, installed, &manifest)?,
        None => Vec::new(),
    };
    if !conflicts.is_empty() {
        if !options.force {
            return Err(Error::Conflict(conflicts));
        }
        for path in &conflicts {
            warn!("Overwriting locally modified {}", path);
        }
    }

    let deployer = FileDeployer::new(target)?;
    let mut report = InstallReport {
        package_name: manifest.package_name.clone(),
        version: manifest.version.clone(),
        overridden: conflicts,
        ..Default::default()
    };

    // Directories first so files always have a parent
    for (path, entry) in archive.content() {
        if matches!(entry, ArchiveEntry::Directory) {
            deployer.deploy_directory(path)?;
            report.directories += 1;
        }
    }
    for (path, entry) in archive.content() {
        if let ArchiveEntry::File { data, mode } = entry {
            deployer.deploy_bytes(path, data, Some(*mode))?;
            report.files += 1;
        }
    }

    // Directory entries recorded in the manifest but not stored as tar
    // entries still have to exist
    for entry in manifest.entries() {
        if entry.checksum == Checksum::Directory && archive.get(&entry.path).is_none() {
            deployer.deploy_directory(&entry.path)?;
            report.directories += 1;
        }
    }

    state::write(target, &manifest)?;

    info!(
        "Installed {} {}: {} files, {} directories",
        report.package_name, report.version, report.files, report.directories
    );
    Ok(report)
}
