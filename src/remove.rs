// src/remove.rs

//! Removal of an installed package from a target directory
//!
//! Only what the installed checksums table lists is touched. Directories go
//! last and deepest first, and a directory that still has foreign content is
//! left in place with a warning.

use crate::config::Options;
use crate::error::{Error, Result};
use crate::filesystem::{FileDeployer, PkgPath};
use crate::hash::Checksum;
use crate::state::{self, InstalledState};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// What a removal did
#[derive(Debug, Clone, Default)]
pub struct RemoveReport {
    pub package_name: String,
    pub version: String,
    pub removed_files: Vec<PkgPath>,
    pub removed_dirs: Vec<PkgPath>,
    /// Every directory removal attempted, in order
    pub attempted_dirs: Vec<PkgPath>,
    /// Locally modified files deleted because of `force`
    pub overridden: Vec<PkgPath>,
    /// Deletions that failed, already logged
    pub warnings: Vec<String>,
}

/// Deepest first, then reverse lexicographic
pub fn directory_removal_order(mut dirs: Vec<PkgPath>) -> Vec<PkgPath> {
    dirs.sort_by(|a, b| {
        b.depth()
            .cmp(&a.depth())
            .then_with(|| b.as_str().cmp(a.as_str()))
    });
    dirs
}

/// Remove the package installed in `target`
pub fn remove(target: &Path, options: &Options) -> Result<RemoveReport> {
    let installed = InstalledState::load(target)?
        .ok_or_else(|| Error::MissingManifest(target.to_path_buf()))?;
    let manifest = installed.manifest(target)?;
    info!(
        "Removing {} {} from {}",
        manifest.package_name,
        manifest.version,
        target.display()
    );

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut conflicts = Vec::new();

    for entry in manifest.entries() {
        match entry.checksum {
            Checksum::Directory => dirs.push(entry.path),
            Checksum::Digest(_) => {
                let live = entry.path.to_fs_path(target);
                if fs::symlink_metadata(&live).is_ok() && !entry.checksum.matches_path(&live)? {
                    debug!("Conflict: {} was modified since install", entry.path);
                    conflicts.push(entry.path.clone());
                }
                files.push(entry.path);
            }
        }
    }

    if !conflicts.is_empty() {
        if !options.force {
            return Err(Error::Conflict(conflicts));
        }
        for path in &conflicts {
            warn!("Removing locally modified {}", path);
        }
    }

    let deployer = FileDeployer::new(target)?;
    let mut report = RemoveReport {
        package_name: manifest.package_name.clone(),
        version: manifest.version.clone(),
        overridden: conflicts,
        ..Default::default()
    };

    for path in files {
        match deployer.remove_file(&path) {
            Ok(true) => report.removed_files.push(path),
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to remove {}: {}", path, e);
                report.warnings.push(e.to_string());
            }
        }
    }

    for reserved in state::reserved_paths(target) {
        match fs::remove_file(&reserved) {
            Ok(()) => debug!("Removed {}", reserved.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to remove {}: {}", reserved.display(), e);
                report.warnings.push(Error::io(&reserved, e).to_string());
            }
        }
    }

    for dir in directory_removal_order(dirs) {
        report.attempted_dirs.push(dir.clone());
        match deployer.remove_directory(&dir) {
            Ok(true) => report.removed_dirs.push(dir),
            Ok(false) => {}
            Err(e) => {
                warn!("Leaving directory {} in place: {}", dir, e);
                report.warnings.push(e.to_string());
            }
        }
    }

    info!(
        "Removed {} {}: {} files, {} directories, {} warnings",
        report.package_name,
        report.version,
        report.removed_files.len(),
        report.removed_dirs.len(),
        report.warnings.len()
    );
    Ok(report)
}
