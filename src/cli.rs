// src/cli.rs
//! CLI definitions for driftpack
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "driftpack")]
#[command(author = "Driftpack Contributors")]
#[command(version)]
#[command(about = "Package directory trees and detect drift against their checksums", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Proceed even when locally modified files would be affected
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Swap old and new sides when diffing
    #[arg(short = 'R', long, global = true)]
    pub reverse: bool,

    /// VCS used to check out sources: cvs, svn, git, hg or local
    #[arg(long, global = true, value_name = "KIND")]
    pub vcs: Option<String>,

    /// Diff implementation: auto, builtin or external
    #[arg(long = "diff-tool", global = true, value_name = "TOOL")]
    pub diff_tool: Option<String>,

    /// More log output (repeat for debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a package from a module at a tag
    Package {
        /// Module location (repository URL, module name, or local directory)
        module: String,

        /// Tag to check out; also the package version
        tag: String,
    },

    /// Install a package into a directory
    Install {
        /// Package file path or URL
        location: String,

        /// Target directory
        #[arg(default_value = ".")]
        target: String,
    },

    /// Remove the package installed in a directory
    Remove {
        /// Target directory
        #[arg(default_value = ".")]
        target: String,
    },

    /// List the files in a package
    List {
        /// Package file path or URL
        location: String,
    },

    /// Show differences between a package and an installed tree
    Diff {
        /// Package file path or URL
        location: String,

        /// Paths to compare (default: every path in the package)
        paths: Vec<String>,

        /// Directory to compare against
        #[arg(short, long, default_value = ".")]
        target: String,
    },

    /// Classify every path in a directory against its installed package
    Status {
        /// Target directory
        #[arg(default_value = ".")]
        target: String,
    },

    /// Show package name, version and metadata
    Info {
        /// Package file path or URL
        location: String,
    },
}
