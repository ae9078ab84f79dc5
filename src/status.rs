// src/status.rs

//! Drift classification of a target directory

use crate::error::{Error, Result};
use crate::filesystem::PkgPath;
use crate::state::InstalledState;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// State of one path relative to the installed checksums table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Present, but no recorded checksum
    UnknownToPackage,
    /// Recorded, but absent
    Missing,
    UpToDate,
    LocallyModified,
}

impl Classification {
    /// One-character code used in listings
    pub const fn code(&self) -> char {
        match self {
            Self::UnknownToPackage => '?',
            Self::Missing => '!',
            Self::UpToDate => ' ',
            Self::LocallyModified => 'M',
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnknownToPackage => "unknown",
            Self::Missing => "missing",
            Self::UpToDate => "up to date",
            Self::LocallyModified => "modified",
        })
    }
}

/// Every path under `target`, reserved entries excluded
fn live_paths(target: &Path) -> Result<BTreeSet<PkgPath>> {
    let mut paths = BTreeSet::new();
    if !target.exists() {
        return Ok(paths);
    }

    for entry in WalkDir::new(target).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(target).to_path_buf();
            Error::io(&path, e.into())
        })?;
        let path = PkgPath::under(target, entry.path())?;
        if !path.is_reserved() {
            paths.insert(path);
        }
    }
    Ok(paths)
}

/// Classify the union of recorded and present paths, sorted by path
pub fn status(target: &Path) -> Result<Vec<(PkgPath, Classification)>> {
    let installed = InstalledState::load(target)?.unwrap_or_default();
    let live = live_paths(target)?;

    let mut all: BTreeSet<PkgPath> = live.clone();
    if let Some(recorded) = &installed.checksums {
        all.extend(recorded.keys().cloned());
    }

    let mut report = Vec::with_capacity(all.len());
    for path in all {
        let class = match installed.recorded(&path) {
            None => Classification::UnknownToPackage,
            Some(_) if !live.contains(&path) => Classification::Missing,
            Some(checksum) => {
                if checksum.matches_path(&path.to_fs_path(target))? {
                    Classification::UpToDate
                } else {
                    Classification::LocallyModified
                }
            }
        };
        debug!("{} {}", class.code(), path);
        report.push((path, class));
    }
    Ok(report)
}
