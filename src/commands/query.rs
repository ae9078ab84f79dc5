// src/commands/query.rs
//! Read-only package queries

use super::open_package;
use anyhow::{Context, Result};
use driftpack::Field;

/// Print every user-visible path in a package
pub fn cmd_list(location: &str) -> Result<()> {
    let archive = open_package(location)?;
    let manifest = archive
        .manifest()
        .with_context(|| format!("Failed to read manifest of {}", location))?;

    for path in manifest.paths() {
        println!("{}", path);
    }
    Ok(())
}

/// Print name, version and metadata of a package
pub fn cmd_info(location: &str) -> Result<()> {
    let archive = open_package(location)?;
    let manifest = archive
        .manifest()
        .with_context(|| format!("Failed to read manifest of {}", location))?;

    println!("Package: {}", manifest.package_name);
    println!("Version: {}", manifest.version);
    for field in Field::ALL {
        if let Some(value) = manifest.meta(field) {
            println!("{}: {}", field, value);
        }
    }
    println!("Entries: {}", manifest.len());
    Ok(())
}
