// src/diff.rs

//! Differences between a package and a live target directory
//!
//! Only paths whose live checksum disagrees with the package are compared.
//! Binary content is never diffed textually. The unified diff itself comes
//! from a [`DiffBackend`], chosen once by [`select_backend`].

use crate::archive::PackageArchive;
use crate::config::{DiffPreference, Options};
use crate::error::{Error, Result};
use crate::filesystem::PkgPath;
use crate::hash::Checksum;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// How far into a file to look for a NUL byte
const BINARY_PROBE_LEN: usize = 8000;

/// Content with a NUL byte near the start, or that is not UTF-8, is
/// treated as binary
///
/// Text diffs are built from `str`, so a lossy conversion would show
/// replacement characters instead of the real bytes.
pub fn is_binary(data: &[u8]) -> bool {
    data[..data.len().min(BINARY_PROBE_LEN)].contains(&0) || std::str::from_utf8(data).is_err()
}

/// Produces unified diff text
pub trait DiffBackend {
    /// Unified diff of `old` against `new`; empty when they are equal
    fn unified_diff(&self, old_label: &str, old: &[u8], new_label: &str, new: &[u8]) -> Result<String>;

    fn name(&self) -> &'static str;
}

/// In-process diffing with `diffy`
pub struct BuiltinDiff;

impl DiffBackend for BuiltinDiff {
    fn unified_diff(&self, old_label: &str, old: &[u8], new_label: &str, new: &[u8]) -> Result<String> {
        if old == new {
            return Ok(String::new());
        }
        // `is_binary` keeps non-UTF-8 content away from this backend
        let old = String::from_utf8_lossy(old);
        let new = String::from_utf8_lossy(new);
        let patch = diffy::create_patch(&old, &new).to_string();

        // diffy labels the sides "original" and "modified"
        let hunks = patch.splitn(3, '\n').nth(2).unwrap_or("");
        Ok(format!("--- {}\n+++ {}\n{}", old_label, new_label, hunks))
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

/// Runs `diff -u` on scratch copies of both sides
pub struct ExternalDiff {
    program: PathBuf,
}

impl ExternalDiff {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// Locate `diff` on `PATH`
    pub fn probe() -> Option<Self> {
        which::which("diff").ok().map(Self::new)
    }
}

fn scratch_file(data: &[u8]) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new().map_err(|e| Error::io(std::env::temp_dir(), e))?;
    file.write_all(data).map_err(|e| Error::io(file.path(), e))?;
    file.flush().map_err(|e| Error::io(file.path(), e))?;
    Ok(file)
}

impl DiffBackend for ExternalDiff {
    fn unified_diff(&self, old_label: &str, old: &[u8], new_label: &str, new: &[u8]) -> Result<String> {
        // Both scratch files are removed when they drop, on every path out
        let old_file = scratch_file(old)?;
        let new_file = scratch_file(new)?;

        let output = Command::new(&self.program)
            .arg("-u")
            .args(["--label", old_label, "--label", new_label])
            .arg(old_file.path())
            .arg(new_file.path())
            .output()
            .map_err(|e| Error::io(&self.program, e))?;

        // 0: identical, 1: differences, anything else: trouble
        match output.status.code() {
            Some(0) | Some(1) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            _ => Err(Error::io(
                &self.program,
                io::Error::other(String::from_utf8_lossy(&output.stderr).trim().to_string()),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

/// Pick the diff implementation once, at startup
pub fn select_backend(preference: DiffPreference) -> Result<Box<dyn DiffBackend>> {
    let backend: Box<dyn DiffBackend> = match preference {
        DiffPreference::Builtin => Box::new(BuiltinDiff),
        DiffPreference::External => Box::new(
            ExternalDiff::probe()
                .ok_or_else(|| Error::Config("diff backend 'external' requested but diff is not installed".to_string()))?,
        ),
        DiffPreference::Auto => match ExternalDiff::probe() {
            Some(external) => Box::new(external),
            None => Box::new(BuiltinDiff),
        },
    };
    debug!("Using {} diff backend", backend.name());
    Ok(backend)
}

/// Outcome of comparing one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDiff {
    NotInPackage(PkgPath),
    NotFound(PkgPath),
    KindChanged { path: PkgPath, packaged_as_directory: bool },
    /// A symbolic link sits where the package has a file or directory
    LinkOnDisk(PkgPath),
    Binary { old_label: String, new_label: String },
    Unified { path: PkgPath, text: String },
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInPackage(path) => writeln!(f, "{}: not in package", path),
            Self::NotFound(path) => writeln!(f, "{}: not found", path),
            Self::KindChanged {
                path,
                packaged_as_directory: true,
            } => writeln!(f, "{}: directory in package, file on disk", path),
            Self::KindChanged { path, .. } => writeln!(f, "{}: file in package, directory on disk", path),
            Self::LinkOnDisk(path) => writeln!(f, "{}: symbolic link on disk", path),
            Self::Binary { old_label, new_label } => {
                writeln!(f, "Binary files {} and {} differ", old_label, new_label)
            }
            Self::Unified { text, .. } => {
                f.write_str(text)?;
                if !text.ends_with('\n') {
                    f.write_str("\n")?;
                }
                Ok(())
            }
        }
    }
}

/// Write every diff to `out`
pub fn render<W: Write>(diffs: &[FileDiff], out: &mut W) -> io::Result<()> {
    for diff in diffs {
        write!(out, "{}", diff)?;
    }
    Ok(())
}

/// Compare `files` (every package path when empty) against `target`
pub fn diff(
    archive: &PackageArchive,
    target: &Path,
    files: &[PkgPath],
    options: &Options,
    backend: &dyn DiffBackend,
) -> Result<Vec<FileDiff>> {
    let manifest = archive.manifest()?;
    let requested: Vec<PkgPath> = if files.is_empty() {
        manifest.paths().cloned().collect()
    } else {
        files.to_vec()
    };

    let mut diffs = Vec::new();
    for path in requested {
        if path.is_reserved() {
            continue;
        }
        let Some(recorded) = manifest.lookup(&path) else {
            diffs.push(FileDiff::NotInPackage(path));
            continue;
        };

        let live = path.to_fs_path(target);
        let Ok(meta) = fs::symlink_metadata(&live) else {
            diffs.push(FileDiff::NotFound(path));
            continue;
        };
        if recorded.matches_path(&live)? {
            continue;
        }
        if meta.file_type().is_symlink() {
            diffs.push(FileDiff::LinkOnDisk(path));
            continue;
        }

        if recorded.is_directory() != meta.is_dir() {
            diffs.push(FileDiff::KindChanged {
                packaged_as_directory: recorded.is_directory(),
                path,
            });
            continue;
        }
        if let Checksum::Directory = recorded {
            continue;
        }

        let packaged = archive.read(&path).unwrap_or_default();
        let local = fs::read(&live).map_err(|e| Error::io(&live, e))?;

        let (mut old_label, mut new_label) = (format!("a/{}", path.as_str()), format!("b/{}", path.as_str()));
        let (mut old, mut new) = (packaged, local.as_slice());
        if options.reverse {
            std::mem::swap(&mut old_label, &mut new_label);
            std::mem::swap(&mut old, &mut new);
        }

        if is_binary(old) || is_binary(new) {
            diffs.push(FileDiff::Binary { old_label, new_label });
            continue;
        }

        let text = backend.unified_diff(&old_label, old, &new_label, new)?;
        debug!("{} differs ({} bytes of diff)", path, text.len());
        if !text.is_empty() {
            diffs.push(FileDiff::Unified { path, text });
        }
    }
    Ok(diffs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_detection() {
        assert!(is_binary(b"abc\0def"));
        assert!(!is_binary(b"plain text\n"));
        assert!(!is_binary(b""));

        let mut late_nul = vec![b'a'; BINARY_PROBE_LEN];
        late_nul.push(0);
        assert!(!is_binary(&late_nul));

        // Latin-1 "café" has no NUL but is not UTF-8
        assert!(is_binary(b"caf\xe9\n"));
        assert!(!is_binary("café\n".as_bytes()));
    }

    #[test]
    fn test_builtin_unified_diff() {
        let text = BuiltinDiff
            .unified_diff("a/x.txt", b"one\ntwo\nthree\n", "b/x.txt", b"one\n2\nthree\n")
            .unwrap();
        assert!(text.starts_with("--- a/x.txt\n+++ b/x.txt\n@@"));
        assert!(text.contains("-two\n"));
        assert!(text.contains("+2\n"));
    }

    #[test]
    fn test_builtin_equal_is_empty() {
        assert!(BuiltinDiff.unified_diff("a", b"same\n", "b", b"same\n").unwrap().is_empty());
    }

    #[test]
    fn test_external_diff_when_installed() {
        let Some(external) = ExternalDiff::probe() else {
            return;
        };
        let text = external
            .unified_diff("a/x.txt", b"one\ntwo\n", "b/x.txt", b"one\n2\n")
            .unwrap();
        assert!(text.starts_with("--- a/x.txt"));
        assert!(text.contains("+2"));
        assert!(external.unified_diff("a", b"x\n", "b", b"x\n").unwrap().is_empty());
    }

    #[test]
    fn test_select_builtin() {
        assert_eq!(select_backend(DiffPreference::Builtin).unwrap().name(), "builtin");
        assert!(select_backend(DiffPreference::Auto).is_ok());
    }

    #[test]
    fn test_display_lines() {
        let path = PkgPath::parse("etc/x").unwrap();
        assert_eq!(FileDiff::NotFound(path.clone()).to_string(), "./etc/x: not found\n");
        assert_eq!(FileDiff::NotInPackage(path.clone()).to_string(), "./etc/x: not in package\n");
        assert_eq!(
            FileDiff::Binary {
                old_label: "a/etc/x".into(),
                new_label: "b/etc/x".into()
            }
            .to_string(),
            "Binary files a/etc/x and b/etc/x differ\n"
        );

        let mut out = Vec::new();
        render(&[FileDiff::NotFound(path.clone()), FileDiff::NotInPackage(path)], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }
}
