// src/commands/package.rs
//! Package building command

use anyhow::{Context, Result};
use driftpack::Options;
use tracing::info;

/// Build `<module>` at `<tag>` into a package archive
pub fn cmd_package(module: &str, tag: &str, options: &Options) -> Result<()> {
    info!("Building package from {} at {}", module, tag);

    let outcome = driftpack::package::package(module, tag, options)
        .with_context(|| format!("Failed to package {} at {}", module, tag))?;

    println!(
        "Built {} {} ({} entries)",
        outcome.manifest.package_name,
        outcome.manifest.version,
        outcome.manifest.len()
    );
    println!("  {}", outcome.path.display());
    Ok(())
}
