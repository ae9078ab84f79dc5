// src/error.rs

//! Error types for driftpack
//!
//! Library code returns [`Error`]; the CLI wraps it in `anyhow` with context.

use crate::filesystem::PkgPath;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Spec file parse failures, always tied to the offending line
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: unknown operation in '{text}'")]
    UnknownOperation { line: usize, text: String },

    #[error("line {line}: rule '{text}' has an empty pattern")]
    EmptyPattern { line: usize, text: String },

    #[error("line {line}: invalid match pattern '{pattern}': {source}")]
    InvalidPattern {
        line: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors produced by the reconciliation engine and its collaborators
#[derive(Error, Debug)]
pub enum Error {
    #[error("spec parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("no installed package manifest in {}", .0.display())]
    MissingManifest(PathBuf),

    #[error("corrupt manifest: {0}")]
    CorruptManifest(String),

    #[error("installed package is '{installed}', refusing to install '{incoming}' over it")]
    NameMismatch { installed: String, incoming: String },

    #[error("{} locally modified file(s) would be affected: {}", .0.len(), join_paths(.0))]
    Conflict(Vec<PkgPath>),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("checkout failed: {0}")]
    Vcs(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("manifest field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("archive error: {0}")]
    Archive(String),
}

fn join_paths(paths: &[PkgPath]) -> String {
    paths
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Paths reported by a conflict error, empty for every other variant
    pub fn conflicts(&self) -> &[PkgPath] {
        match self {
            Self::Conflict(paths) => paths,
            _ => &[],
        }
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
