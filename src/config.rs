// src/config.rs

//! Runtime options and the user settings file
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. `config.toml` (at `$DRIFTPACK_CONFIG`, or `driftpack/config.toml`
//!    under the platform config directory)
//! 2. `DRIFTPACK_VCS` / `DRIFTPACK_PACKAGER` environment variables
//! 3. command-line flags
//!
//! The result is one [`Options`] value that the CLI builds once and passes by
//! reference into every operation.

use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use crate::vcs::VcsKind;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV: &str = "DRIFTPACK_CONFIG";
/// Environment variable overriding the default VCS kind
pub const VCS_ENV: &str = "DRIFTPACK_VCS";
/// Environment variable overriding the packager identity
pub const PACKAGER_ENV: &str = "DRIFTPACK_PACKAGER";

/// Which unified diff implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffPreference {
    /// External `diff` when installed, builtin otherwise
    #[default]
    Auto,
    Builtin,
    External,
}

impl FromStr for DiffPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "builtin" => Ok(Self::Builtin),
            "external" => Ok(Self::External),
            other => Err(Error::Config(format!(
                "unknown diff backend '{}' (expected auto, builtin or external)",
                other
            ))),
        }
    }
}

impl fmt::Display for DiffPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Builtin => "builtin",
            Self::External => "external",
        })
    }
}

/// Options threaded through every operation
#[derive(Debug, Clone)]
pub struct Options {
    /// Proceed past checksum conflicts
    pub force: bool,
    /// Swap old and new sides of diffs
    pub reverse: bool,
    /// VCS used to check out package sources
    pub vcs: VcsKind,
    /// Use the git library rather than the `git` binary
    pub prefer_library_vcs: bool,
    pub diff_backend: DiffPreference,
    /// Default `Packager` metadata value
    pub packager: String,
    /// Algorithm for new checksums tables
    pub hash: HashAlgorithm,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            force: false,
            reverse: false,
            vcs: VcsKind::Git,
            prefer_library_vcs: false,
            diff_backend: DiffPreference::Auto,
            packager: "unknown".to_string(),
            hash: HashAlgorithm::Sha256,
        }
    }
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub vcs: Option<String>,
    pub packager: Option<String>,
    pub diff: Option<String>,
    pub hash: Option<String>,
    pub git_library: Option<bool>,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load settings from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!("Loading settings from {}", path.display());
                Self::parse(&text).map_err(|e| match e {
                    Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
                    other => other,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self> {
        match settings_path(|key| std::env::var(key).ok()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Layer environment overrides on top of the file values
    ///
    /// `lookup` is normally `std::env::var`, taken as a parameter so tests
    /// never mutate the process environment.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(vcs) = lookup(VCS_ENV).filter(|v| !v.is_empty()) {
            self.vcs = Some(vcs);
        }
        if let Some(packager) = lookup(PACKAGER_ENV).filter(|v| !v.is_empty()) {
            self.packager = Some(packager);
        }
        self
    }

    /// Resolve into runtime options, with flags still to be applied by the caller
    pub fn into_options(self) -> Result<Options> {
        let mut options = Options::default();
        if let Some(vcs) = &self.vcs {
            options.vcs = vcs.parse()?;
        }
        options.packager = self.packager.unwrap_or_else(default_packager);
        if let Some(diff) = &self.diff {
            options.diff_backend = diff.parse()?;
        }
        if let Some(hash) = &self.hash {
            options.hash = hash.parse()?;
        }
        options.prefer_library_vcs = self.git_library.unwrap_or(false);
        Ok(options)
    }
}

/// Where the settings file lives, `None` if no config directory is known
pub fn settings_path(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(explicit) = lookup(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::config_dir().map(|dir| dir.join("driftpack").join("config.toml"))
}

/// `$USER@<hostname>`, or `unknown` when the user can't be determined
pub fn default_packager() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|u| !u.is_empty());
    match (user, hostname()) {
        (Some(user), Some(host)) => format!("{}@{}", user, host),
        (Some(user), None) => user,
        _ => "unknown".to_string(),
    }
}

fn hostname() -> Option<String> {
    if let Ok(contents) = std::fs::read_to_string("/etc/hostname") {
        let name = contents.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty())
}
