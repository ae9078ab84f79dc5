// src/package.rs

//! Building a package from a module at a tag
//!
//! The pipeline runs the same steps whatever the source:
//!
//! 1. obtain the package root (VCS checkout into a scratch directory, or a
//!    local directory as is)
//! 2. parse `driftpack.spec` at that root
//! 3. collect the file set and fingerprint it into a manifest
//! 4. write `<Destination>/<NameFormat>.dpk`

use crate::archive::{self, PACKAGE_SUFFIX};
use crate::collect;
use crate::config::Options;
use crate::error::{Error, Result};
use crate::manifest::{Manifest, Provenance};
use crate::spec::{self, Field, SPEC_FILE_NAME};
use crate::vcs::{self, VcsKind};
use chrono::{SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default archive stem template
pub const DEFAULT_NAME_FORMAT: &str = "%n-%v";

/// Result of a successful packaging run
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    /// Where the archive was written
    pub path: PathBuf,
    pub manifest: Manifest,
}

/// Package name for a module: its last path segment without `.git`
///
/// ```
/// use driftpack::package::package_name_for;
///
/// assert_eq!(package_name_for("https://host/tools/widget.git").unwrap(), "widget");
/// assert_eq!(package_name_for("git@host:widget.git").unwrap(), "widget");
/// assert_eq!(package_name_for("projects/widget/").unwrap(), "widget");
/// ```
pub fn package_name_for(module: &str) -> Result<String> {
    let trimmed = module.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::EmptyField("package name"));
    }
    Ok(name.to_string())
}

/// Expand `%n` (name), `%v` (version) and `%%` in an archive name template
pub fn expand_name_format(format: &str, name: &str, version: &str) -> Result<String> {
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push_str(name),
            Some('v') => out.push_str(version),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }

    if out.is_empty() || out.contains('/') {
        return Err(Error::InvalidPath(format!(
            "NameFormat '{}' expands to unusable file name '{}'",
            format, out
        )));
    }
    Ok(out)
}

/// Package `module` at `tag`, resolving Destination against the current directory
pub fn package(module: &str, tag: &str, options: &Options) -> Result<PackageOutcome> {
    let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;
    package_into(module, tag, options, &cwd)
}

/// Package `module` at `tag`, resolving Destination against `base`
pub fn package_into(module: &str, tag: &str, options: &Options, base: &Path) -> Result<PackageOutcome> {
    info!("Packaging {} at {} ({})", module, tag, options.vcs);

    // Scratch checkout lives until the archive is written, then is removed
    let scratch;
    let (root, name) = match vcs::select_checkout(options.vcs, options.prefer_library_vcs)? {
        Some(checkout) => {
            scratch = tempfile::TempDir::new().map_err(|e| Error::io(std::env::temp_dir(), e))?;
            let root = checkout.checkout(module, tag, &scratch.path().join("src"))?;
            (root, package_name_for(module)?)
        }
        None => {
            let root = PathBuf::from(module);
            if !root.is_dir() {
                return Err(Error::io(&root, std::io::Error::from(std::io::ErrorKind::NotFound)));
            }
            let canonical = root.canonicalize().map_err(|e| Error::io(&root, e))?;
            let name = match canonical.file_name().and_then(|n| n.to_str()) {
                Some(dir_name) => package_name_for(dir_name)?,
                None => package_name_for(module)?,
            };
            (root, name)
        }
    };

    let spec = spec::parse_file(&root.join(SPEC_FILE_NAME))?;
    let files = collect::collect(&root, &spec)?;
    debug!("Collected {} entries from {}", files.len(), root.display());

    let mut fields = spec.fields.clone();
    fields
        .entry(Field::Packager)
        .or_insert_with(|| options.packager.clone());

    let provenance = Provenance {
        built: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        vcs: (options.vcs != VcsKind::Local).then(|| options.vcs.name().to_string()),
    };
    let manifest = Manifest::build(&root, &files, &name, tag, &fields, &provenance, options.hash)?;

    let destination = base.join(spec.field(Field::Destination).unwrap_or("."));
    fs::create_dir_all(&destination).map_err(|e| Error::io(&destination, e))?;

    let stem = expand_name_format(
        spec.field(Field::NameFormat).unwrap_or(DEFAULT_NAME_FORMAT),
        &manifest.package_name,
        &manifest.version,
    )?;
    let output = destination.join(format!("{}{}", stem, PACKAGE_SUFFIX));
    let path = archive::write_package(&output, &root, &manifest)?;

    Ok(PackageOutcome { path, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::PackageArchive;
    use crate::filesystem::PkgPath;
    use tempfile::TempDir;

    fn local_options() -> Options {
        Options {
            vcs: VcsKind::Local,
            packager: "tester@host".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_package_name_for() {
        assert_eq!(package_name_for("widget").unwrap(), "widget");
        assert_eq!(package_name_for("/srv/git/widget.git/").unwrap(), "widget");
        assert_eq!(package_name_for("tools/widget").unwrap(), "widget");
        assert!(package_name_for("/").is_err());
        assert!(package_name_for(".git").is_err());
    }

    #[test]
    fn test_expand_name_format() {
        assert_eq!(expand_name_format("%n-%v", "tool", "1.0").unwrap(), "tool-1.0");
        assert_eq!(expand_name_format("%n_%v_100%%", "t", "2").unwrap(), "t_2_100%");
        assert_eq!(expand_name_format("pkg-%x", "t", "2").unwrap(), "pkg-%x");
        assert!(expand_name_format("%n/%v", "t", "2").is_err());
        assert!(expand_name_format("", "t", "2").is_err());
    }

    #[test]
    fn test_package_local_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("widget");
        fs::create_dir_all(root.join("src/sub")).unwrap();
        fs::write(root.join("src/a.txt"), "hello").unwrap();
        fs::write(root.join("src/sub/b.txt"), "world").unwrap();
        fs::write(
            root.join(SPEC_FILE_NAME),
            "Destination: dist\nNameFormat: %n_%v\nAuthor: A. Person\n+src\n",
        )
        .unwrap();

        let outcome = package_into(root.to_str().unwrap(), "1.0", &local_options(), temp.path()).unwrap();
        assert_eq!(outcome.path, temp.path().join("dist/widget_1.0.dpk"));
        assert_eq!(outcome.manifest.package_name, "widget");
        assert_eq!(outcome.manifest.meta(Field::Packager), Some("tester@host"));
        assert_eq!(outcome.manifest.meta(Field::Author), Some("A. Person"));
        assert!(outcome.manifest.meta(Field::Built).is_some());
        assert_eq!(outcome.manifest.meta(Field::Vcs), None);

        let archive = PackageArchive::open(&outcome.path).unwrap();
        assert_eq!(archive.manifest().unwrap(), outcome.manifest);
        assert!(archive.is_directory(&PkgPath::parse("src/sub").unwrap()));
    }

    #[test]
    fn test_spec_packager_wins() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tool");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("file"), "x").unwrap();
        fs::write(root.join(SPEC_FILE_NAME), "Packager: Release Team\n+file\n").unwrap();

        let outcome = package_into(root.to_str().unwrap(), "2", &local_options(), temp.path()).unwrap();
        assert_eq!(outcome.manifest.meta(Field::Packager), Some("Release Team"));
        assert_eq!(outcome.path, temp.path().join("tool-2.dpk"));
    }

    #[test]
    fn test_missing_spec_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("bare");
        fs::create_dir_all(&root).unwrap();

        let err = package_into(root.to_str().unwrap(), "1", &local_options(), temp.path()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_missing_local_module() {
        let temp = TempDir::new().unwrap();
        let err = package_into("/nonexistent/module", "1", &local_options(), temp.path()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
