// src/filesystem/mod.rs

//! Filesystem boundary for driftpack
//!
//! This module provides:
//! - [`PkgPath`], the normalized path type every other module works with
//! - [`FileDeployer`], which writes and removes entries below a target root

mod deployer;
pub mod path;

pub use deployer::FileDeployer;
pub use path::PkgPath;
