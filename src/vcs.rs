// src/vcs.rs

//! Source checkout for packaging
//!
//! Packaging always starts from a clean export of a module at a tag. The
//! rest of the pipeline only sees the [`Checkout`] trait; which
//! implementation backs it is decided once by [`select_checkout`].

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use tracing::{debug, info};

/// Supported version control systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Cvs,
    Svn,
    Git,
    Hg,
    /// Package straight from a local directory, no checkout
    Local,
}

impl VcsKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cvs => "cvs",
            Self::Svn => "svn",
            Self::Git => "git",
            Self::Hg => "hg",
            Self::Local => "local",
        }
    }

    /// Binary the shell implementation runs, `None` for local
    pub const fn binary(&self) -> Option<&'static str> {
        match self {
            Self::Local => None,
            other => Some(other.name()),
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VcsKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cvs" => Ok(Self::Cvs),
            "svn" | "subversion" => Ok(Self::Svn),
            "git" => Ok(Self::Git),
            "hg" | "mercurial" => Ok(Self::Hg),
            "local" | "none" => Ok(Self::Local),
            other => Err(Error::Config(format!("unknown VCS kind '{}'", other))),
        }
    }
}

/// Materializes `module` at `tag` into a fresh directory
pub trait Checkout {
    /// Export into `dest` (which must not exist yet) and return the root
    fn checkout(&self, module: &str, tag: &str, dest: &Path) -> Result<PathBuf>;

    /// Which VCS this is, recorded in package metadata
    fn kind(&self) -> VcsKind;
}

/// Runs the VCS command-line client
pub struct ShellCheckout {
    kind: VcsKind,
}

impl ShellCheckout {
    pub fn new(kind: VcsKind) -> Self {
        Self { kind }
    }

    /// Program and arguments for one checkout
    pub fn command_line(&self, module: &str, tag: &str, dest: &Path) -> Result<(String, Vec<String>)> {
        let dest = dest.display().to_string();
        let args: Vec<String> = match self.kind {
            VcsKind::Cvs => vec!["-Q".into(), "export".into(), "-r".into(), tag.into(), "-d".into(), dest, module.into()],
            VcsKind::Svn => vec![
                "export".into(),
                "-q".into(),
                format!("{}/tags/{}", module.trim_end_matches('/'), tag),
                dest,
            ],
            VcsKind::Git => vec![
                "clone".into(),
                "-q".into(),
                "--depth".into(),
                "1".into(),
                "--branch".into(),
                tag.into(),
                module.into(),
                dest,
            ],
            VcsKind::Hg => vec!["clone".into(), "-q".into(), "-u".into(), tag.into(), module.into(), dest],
            VcsKind::Local => {
                return Err(Error::Vcs("local sources have no checkout command".to_string()));
            }
        };
        Ok((self.kind.name().to_string(), args))
    }
}

impl Checkout for ShellCheckout {
    fn checkout(&self, module: &str, tag: &str, dest: &Path) -> Result<PathBuf> {
        let (program, args) = self.command_line(module, tag, dest)?;
        info!("Checking out {} at {} with {}", module, tag, program);
        debug!("Running: {} {}", program, args.join(" "));

        let output = Command::new(&program)
            .args(&args)
            .output()
            .map_err(|e| Error::Vcs(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(Error::Vcs(format!(
                "{} checkout of {} at {} failed: {}",
                program,
                module,
                tag,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(dest.to_path_buf())
    }

    fn kind(&self) -> VcsKind {
        self.kind
    }
}

/// Git checkout through libgit2, for hosts without a `git` binary
pub struct GitLibrary;

impl Checkout for GitLibrary {
    fn checkout(&self, module: &str, tag: &str, dest: &Path) -> Result<PathBuf> {
        use git2::build::{CheckoutBuilder, RepoBuilder};

        info!("Cloning {} at {} with libgit2", module, tag);
        let git_err = |what: &str, e: git2::Error| {
            Error::Vcs(format!("{} ({} at {}): {}", what, module, tag, e.message()))
        };

        let repo = RepoBuilder::new()
            .clone(module, dest)
            .map_err(|e| git_err("clone failed", e))?;

        let (object, reference) = repo
            .revparse_ext(tag)
            .map_err(|e| git_err("tag not found", e))?;
        repo.checkout_tree(&object, Some(CheckoutBuilder::default().force()))
            .map_err(|e| git_err("checkout failed", e))?;

        let head = match reference.as_ref().and_then(|r| r.name()) {
            Some(name) => repo.set_head(name),
            None => repo.set_head_detached(object.id()),
        };
        head.map_err(|e| git_err("failed to set HEAD", e))?;

        debug!("Checked out {} to {}", object.id(), dest.display());
        Ok(dest.to_path_buf())
    }

    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }
}

/// Pick the checkout implementation for `kind`
///
/// Git falls back to the library when `git` is not on `PATH`; the other
/// kinds need their client installed. `Local` returns `Ok(None)`.
pub fn select_checkout(kind: VcsKind, prefer_library: bool) -> Result<Option<Box<dyn Checkout>>> {
    let Some(binary) = kind.binary() else {
        return Ok(None);
    };
    let installed = which::which(binary).is_ok();

    if kind == VcsKind::Git && (prefer_library || !installed) {
        debug!("Using libgit2 for git checkouts");
        return Ok(Some(Box::new(GitLibrary)));
    }
    if !installed {
        return Err(Error::Vcs(format!("{} is not installed", binary)));
    }
    Ok(Some(Box::new(ShellCheckout::new(kind))))
}
