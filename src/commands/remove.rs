// src/commands/remove.rs
//! Package removal command

use anyhow::{Context, Result};
use driftpack::Options;
use std::path::Path;
use tracing::info;

/// Remove the package installed in `target`
pub fn cmd_remove(target: &str, options: &Options) -> Result<()> {
    info!("Removing package installed in {}", target);

    let report = driftpack::remove::remove(Path::new(target), options)
        .with_context(|| format!("Failed to remove package from {}", target))?;

    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    println!(
        "Removed {} {} ({} files, {} directories)",
        report.package_name,
        report.version,
        report.removed_files.len(),
        report.removed_dirs.len()
    );
    Ok(())
}
