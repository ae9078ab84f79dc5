// src/commands/mod.rs
//! Command handlers for the driftpack CLI

mod diff;
mod install;
mod package;
mod query;
mod remove;
mod status;

pub use diff::cmd_diff;
pub use install::cmd_install;
pub use package::cmd_package;
pub use query::{cmd_info, cmd_list};
pub use remove::cmd_remove;
pub use status::cmd_status;

use anyhow::{Context, Result};
use driftpack::fetch::{self, Location};
use driftpack::PackageArchive;
use tracing::debug;

/// Resolve a package location the user typed and read the package
pub fn open_package(location: &str) -> Result<PackageArchive> {
    let parsed = Location::parse(location)
        .with_context(|| format!("Invalid package location '{}'", location))?;
    debug!("Opening package from {}", parsed);
    fetch::open_archive(&parsed).with_context(|| format!("Failed to read package {}", location))
}
