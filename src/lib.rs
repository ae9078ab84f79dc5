// src/lib.rs

//! driftpack
//!
//! Manifest-driven directory packaging with checksum drift detection.
//! A package records a name, a version, metadata and a path to checksum
//! table; the same table, left behind in a target directory after install,
//! is what every later operation reconciles the live tree against.
//!
//! # Architecture
//!
//! - Packaging: `spec` -> `collect` -> `hash` -> `manifest` -> `archive`
//! - Consuming: `archive` -> `manifest` -> one of `install`, `remove`,
//!   `diff`, `status`, each also reading the live filesystem
//! - Collaborators behind traits: [`vcs::Checkout`], [`diff::DiffBackend`],
//!   [`fetch::Transport`]
//! - No ambient state: every operation takes an explicit [`Options`]

pub mod archive;
pub mod collect;
pub mod compression;
pub mod config;
pub mod diff;
mod error;
pub mod fetch;
pub mod filesystem;
pub mod hash;
pub mod install;
pub mod manifest;
pub mod package;
pub mod remove;
pub mod spec;
pub mod state;
pub mod status;
pub mod vcs;

pub use archive::{ArchiveWriter, PackageArchive};
pub use collect::{EntryKind, FileSet};
pub use config::{DiffPreference, Options, Settings};
pub use diff::{DiffBackend, FileDiff};
pub use error::{Error, ParseError, Result};
pub use fetch::Location;
pub use filesystem::PkgPath;
pub use hash::{Checksum, HashAlgorithm, Hasher};
pub use install::InstallReport;
pub use manifest::{FileEntry, Manifest, Provenance};
pub use package::PackageOutcome;
pub use remove::RemoveReport;
pub use spec::{Field, PackageSpec, RuleKind};
pub use state::InstalledState;
pub use status::Classification;
pub use vcs::{Checkout, VcsKind};
