// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use driftpack::package::package_into;
use driftpack::{Options, PackageArchive, VcsKind};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Options for packaging straight from a local directory
pub fn local_options() -> Options {
    Options {
        vcs: VcsKind::Local,
        packager: "tests@localhost".to_string(),
        ..Default::default()
    }
}

pub fn forced() -> Options {
    Options {
        force: true,
        ..local_options()
    }
}

/// Write `content` at `rel` below `root`, creating parents
pub fn write_file(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A scratch area holding one source tree, its built package and a target
pub struct Fixture {
    pub temp: TempDir,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Fixture {
    /// Create a source tree named `name` with a typical layout and spec
    pub fn new(name: &str) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join(name);
        let target = temp.path().join("target");

        write_file(&source, "src/a.txt", "hello");
        write_file(&source, "src/sub/b.txt", "world");
        write_file(&source, "etc/app.conf", "port = 8080\nworkers = 4\n");
        write_file(&source, "share/logo.bin", [0x89, b'P', b'N', b'G', 0x00, 0x01, 0x02]);
        write_file(&source, "src/debug.log", "noise");
        write_file(
            &source,
            driftpack::spec::SPEC_FILE_NAME,
            "# test package\nDestination: dist\nDescription: Fixture package\n+src\n+etc\n+share\n~\\.log$\n",
        );

        Self {
            temp,
            source,
            target,
        }
    }

    /// Replace the spec file
    pub fn spec(&self, text: &str) {
        write_file(&self.source, driftpack::spec::SPEC_FILE_NAME, text);
    }

    /// Package the source tree as `version`, returning the archive path
    pub fn build(&self, version: &str) -> PathBuf {
        package_into(self.source.to_str().unwrap(), version, &local_options(), self.temp.path())
            .unwrap()
            .path
    }

    pub fn open(&self, version: &str) -> PackageArchive {
        PackageArchive::open(&self.build(version)).unwrap()
    }

    pub fn install(&self, archive: &PackageArchive) {
        driftpack::install::install(archive, &self.target, &local_options()).unwrap();
    }

    pub fn target_file(&self, rel: &str) -> PathBuf {
        self.target.join(rel)
    }
}
