// src/commands/status.rs
//! Drift status command

use anyhow::{Context, Result};
use std::path::Path;

/// Print `<code> <path>` for every known or present path
pub fn cmd_status(target: &str) -> Result<()> {
    let report = driftpack::status::status(Path::new(target))
        .with_context(|| format!("Failed to compute status of {}", target))?;

    for (path, class) in &report {
        println!("{} {}", class.code(), path);
    }
    Ok(())
}
