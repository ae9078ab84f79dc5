// src/filesystem/path.rs

//! Normalized package paths
//!
//! Every path that enters the engine, whether it comes from a directory walk,
//! a checksums table, a tar entry or the command line, is turned into a
//! [`PkgPath`] exactly once. A `PkgPath` is relative, contains no `.` or `..`
//! components, and always renders with a leading `./`.

use crate::error::{Error, Result};
use crate::manifest::RESERVED_ENTRIES;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A normalized relative path inside a package or target directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PkgPath(String);

impl PkgPath {
    /// Parse a path from an untrusted source
    ///
    /// Accepts `./a/b`, `a/b`, `a/b/` and `/a/b` (leading slashes are
    /// stripped). Rejects `..` components, control characters and paths that
    /// normalize to nothing.
    ///
    /// ```
    /// use driftpack::PkgPath;
    ///
    /// let p = PkgPath::parse("./src//sub/").unwrap();
    /// assert_eq!(p.as_str(), "src/sub");
    /// assert_eq!(p.to_string(), "./src/sub");
    /// assert!(PkgPath::parse("../etc/passwd").is_err());
    /// assert!(PkgPath::parse(".").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        Self::from_relative(Path::new(raw.trim_start_matches('/')))
    }

    /// Build from a path relative to some root, as produced by `strip_prefix`
    pub fn from_relative(path: &Path) -> Result<Self> {
        let mut parts: Vec<String> = Vec::new();

        for component in path.components() {
            match component {
                Component::Normal(c) => {
                    let part = c.to_str().ok_or_else(|| {
                        Error::InvalidPath(format!("non UTF-8 path: {}", path.display()))
                    })?;
                    // Checksums tables are line oriented
                    if part.chars().any(char::is_control) {
                        return Err(Error::InvalidPath(format!(
                            "control character in path: {:?}",
                            path
                        )));
                    }
                    parts.push(part.to_string());
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(Error::InvalidPath(format!(
                        "path traversal detected: {}",
                        path.display()
                    )));
                }
                Component::Prefix(_) | Component::RootDir => {}
            }
        }

        if parts.is_empty() {
            return Err(Error::InvalidPath(format!(
                "empty path after normalization: '{}'",
                path.display()
            )));
        }

        Ok(Self(parts.join("/")))
    }

    /// Build from an absolute or root-relative filesystem path under `root`
    pub fn under(root: &Path, path: &Path) -> Result<Self> {
        let relative = path.strip_prefix(root).map_err(|_| {
            Error::InvalidPath(format!(
                "{} is not under {}",
                path.display(),
                root.display()
            ))
        })?;
        Self::from_relative(relative)
    }

    /// The path without the `./` prefix, e.g. `src/a.txt`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of components (`a` is 1, `a/b/c` is 3)
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }

    /// The containing directory, or `None` at the top level
    pub fn parent(&self) -> Option<PkgPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| PkgPath(parent.to_string()))
    }

    /// The last component
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// True for the top-level reserved manifest entries
    pub fn is_reserved(&self) -> bool {
        RESERVED_ENTRIES.contains(&self.0.as_str())
    }

    /// Resolve against a target directory
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    /// The name used inside the archive, e.g. `./src/a.txt`
    pub fn archive_name(&self) -> String {
        format!("./{}", self.0)
    }
}

impl fmt::Display for PkgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "./{}", self.0)
    }
}
