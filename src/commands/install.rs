// src/commands/install.rs
//! Package installation command

use super::open_package;
use anyhow::{Context, Result};
use driftpack::Options;
use std::path::Path;
use tracing::info;

/// Install a package into `target`
pub fn cmd_install(location: &str, target: &str, options: &Options) -> Result<()> {
    info!("Installing {} into {}", location, target);
    let archive = open_package(location)?;

    let report = driftpack::install::install(&archive, Path::new(target), options)
        .with_context(|| format!("Failed to install {} into {}", location, target))?;

    for path in &report.overridden {
        println!("Overwrote locally modified {}", path);
    }
    println!(
        "Installed {} {} into {} ({} files, {} directories)",
        report.package_name, report.version, target, report.files, report.directories
    );
    Ok(())
}
