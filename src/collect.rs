// src/collect.rs

//! File collection
//!
//! Walks every Add root of a spec and produces the set of paths a package
//! will contain. Exclude rules prune whole subtrees, MatchExclude rules drop
//! single entries, and directories are recorded only as ancestors of a
//! selected file so that an empty directory never ends up in a package.
//! Symbolic links are not packaged.

use crate::archive::PACKAGE_SUFFIX;
use crate::error::{Error, Result};
use crate::filesystem::PkgPath;
use crate::spec::{PackageSpec, RuleKind, SPEC_FILE_NAME};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Version control metadata directories skipped when the spec prunes them
const VCS_METADATA_DIRS: &[&str] = &["CVS", ".svn", ".git", ".hg"];

/// Whether a selected path is content or a containing directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// The selected paths of a package, iterated in lexicographic order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: BTreeMap<PkgPath, EntryKind>,
}

impl FileSet {
    pub fn insert_file(&mut self, path: PkgPath) {
        self.entries.insert(path, EntryKind::File);
    }

    pub fn insert_directory(&mut self, path: PkgPath) {
        self.entries.entry(path).or_insert(EntryKind::Directory);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        PkgPath::parse(path)
            .map(|p| self.entries.contains_key(&p))
            .unwrap_or(false)
    }

    pub fn kind(&self, path: &PkgPath) -> Option<EntryKind> {
        self.entries.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PkgPath, EntryKind)> {
        self.entries.iter().map(|(p, k)| (p, *k))
    }

    pub fn paths(&self) -> impl Iterator<Item = &PkgPath> {
        self.entries.keys()
    }
}

/// Compiled form of a spec's exclusion rules
struct Selector {
    excludes: HashSet<String>,
    matchers: Vec<Regex>,
    prune_vcs: bool,
}

impl Selector {
    fn new(spec: &PackageSpec) -> Result<Self> {
        let excludes = spec
            .rules
            .patterns(RuleKind::Exclude)
            .map(str::to_string)
            .collect();

        let matchers = spec
            .rules
            .patterns(RuleKind::MatchExclude)
            .map(|p| {
                Regex::new(p).map_err(|e| Error::InvalidPath(format!("bad match pattern {}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            excludes,
            matchers,
            prune_vcs: spec.prune_vcs_dirs(),
        })
    }

    /// Subtrees that are never descended into
    fn prunes(&self, entry: &DirEntry, rel: Option<&PkgPath>) -> bool {
        let Some(rel) = rel else {
            return false;
        };
        if self.excludes.contains(rel.as_str()) {
            return true;
        }
        self.prune_vcs
            && entry.file_type().is_dir()
            && VCS_METADATA_DIRS.contains(&rel.file_name())
    }

    fn match_excluded(&self, rel: &PkgPath) -> bool {
        self.matchers.iter().any(|re| re.is_match(rel.as_str()))
    }
}

/// Is this the spec itself, a built package, or a reserved manifest entry?
fn is_self_reference(rel: &PkgPath) -> bool {
    rel.as_str() == SPEC_FILE_NAME || rel.file_name().ends_with(PACKAGE_SUFFIX) || rel.is_reserved()
}

/// Collect the file set for `spec`, with Add roots relative to `root`
pub fn collect(root: &Path, spec: &PackageSpec) -> Result<FileSet> {
    let selector = Selector::new(spec)?;
    let mut set = FileSet::default();

    for add in spec.rules.patterns(RuleKind::Add) {
        let walk_root = root.join(add);
        if !walk_root.exists() {
            return Err(Error::io(
                &walk_root,
                io::Error::new(io::ErrorKind::NotFound, "add root does not exist"),
            ));
        }
        let walk_rel = PkgPath::under(root, &walk_root).ok();
        debug!("Collecting from {}", walk_root.display());

        let walker = WalkDir::new(&walk_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let rel = PkgPath::under(root, e.path()).ok();
                !selector.prunes(e, rel.as_ref())
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| walk_root.clone());
                Error::io(path, io::Error::from(e))
            })?;

            if entry.file_type().is_dir() {
                continue;
            }
            let rel = PkgPath::under(root, entry.path())?;

            if entry.path_is_symlink() {
                warn!("Skipping symbolic link {}", rel);
                continue;
            }
            if is_self_reference(&rel) {
                debug!("Skipping self reference {}", rel);
                continue;
            }
            if selector.match_excluded(&rel) {
                debug!("Match-excluded {}", rel);
                continue;
            }

            let mut parent = rel.parent();
            while let Some(dir) = parent {
                if walk_rel.as_ref() == Some(&dir) {
                    break;
                }
                parent = dir.parent();
                set.insert_directory(dir);
            }
            set.insert_file(rel);
        }
    }

    Ok(set)
}
