// src/commands/diff.rs
//! Package-versus-disk diff command

use super::open_package;
use anyhow::{Context, Result};
use driftpack::{Options, PkgPath};
use std::io::{self, Write};
use std::path::Path;

/// Print differences between a package and `target`
pub fn cmd_diff(location: &str, paths: &[String], target: &str, options: &Options) -> Result<()> {
    let backend = driftpack::diff::select_backend(options.diff_backend)?;
    let archive = open_package(location)?;

    let files = paths
        .iter()
        .map(|p| PkgPath::parse(p).with_context(|| format!("Invalid path '{}'", p)))
        .collect::<Result<Vec<_>>>()?;

    let diffs = driftpack::diff::diff(&archive, Path::new(target), &files, options, backend.as_ref())
        .with_context(|| format!("Failed to diff {} against {}", location, target))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    driftpack::diff::render(&diffs, &mut out)?;
    out.flush()?;
    Ok(())
}
