// tests/workflow.rs

//! Package, install, status, diff and remove workflow tests.

mod common;

use common::{Fixture, forced, local_options};
use driftpack::diff::{self, BuiltinDiff, FileDiff};
use driftpack::manifest::CHECKSUMS_ENTRY;
use driftpack::status::{self, Classification};
use driftpack::{Error, PkgPath};
use std::fs;

fn p(s: &str) -> PkgPath {
    PkgPath::parse(s).unwrap()
}

#[test]
fn test_round_trip_is_byte_identical() {
    let fx = Fixture::new("widget");
    let archive = fx.open("1.0");
    fx.install(&archive);

    for rel in ["src/a.txt", "src/sub/b.txt", "etc/app.conf", "share/logo.bin"] {
        assert_eq!(
            fs::read(fx.source.join(rel)).unwrap(),
            fs::read(fx.target_file(rel)).unwrap(),
            "{} differs after install",
            rel
        );
    }

    let manifest = archive.manifest().unwrap();
    assert_eq!(
        fs::read_to_string(fx.target.join(CHECKSUMS_ENTRY)).unwrap(),
        manifest.to_checksums_table()
    );
    assert!(!fx.target_file("src/debug.log").exists());
}

#[test]
fn test_fresh_install_is_clean() {
    let fx = Fixture::new("widget");
    let archive = fx.open("1.0");
    fx.install(&archive);

    let report = status::status(&fx.target).unwrap();
    assert!(!report.is_empty());
    assert!(
        report
            .iter()
            .all(|(_, c)| !matches!(c, Classification::Missing | Classification::LocallyModified))
    );
    assert!(report.contains(&(p("src/sub/b.txt"), Classification::UpToDate)));
    // Walk roots are not recorded themselves
    assert!(report.contains(&(p("src"), Classification::UnknownToPackage)));

    let diffs = diff::diff(&archive, &fx.target, &[], &local_options(), &BuiltinDiff).unwrap();
    assert!(diffs.is_empty(), "unexpected diffs: {:?}", diffs);
}

#[test]
fn test_status_twice_is_identical() {
    let fx = Fixture::new("widget");
    fx.install(&fx.open("1.0"));
    fs::write(fx.target_file("etc/app.conf"), "changed").unwrap();
    fs::write(fx.target_file("extra.txt"), "extra").unwrap();

    assert_eq!(status::status(&fx.target).unwrap(), status::status(&fx.target).unwrap());
}

#[test]
fn test_one_modified_byte() {
    let fx = Fixture::new("widget");
    let archive = fx.open("1.0");
    fx.install(&archive);

    // port = 8080 -> port = 8081
    let conf = fx.target_file("etc/app.conf");
    let mut bytes = fs::read(&conf).unwrap();
    bytes[10] = b'1';
    fs::write(&conf, &bytes).unwrap();

    let modified: Vec<PkgPath> = status::status(&fx.target)
        .unwrap()
        .into_iter()
        .filter(|(_, c)| *c == Classification::LocallyModified)
        .map(|(path, _)| path)
        .collect();
    assert_eq!(modified, [p("etc/app.conf")]);

    let diffs = diff::diff(&archive, &fx.target, &[], &local_options(), &BuiltinDiff).unwrap();
    assert_eq!(diffs.len(), 1);
    match &diffs[0] {
        FileDiff::Unified { path, text } => {
            assert_eq!(path, &p("etc/app.conf"));
            assert!(text.contains("-port = 8080"));
            assert!(text.contains("+port = 8081"));
        }
        other => panic!("expected a unified diff, got {:?}", other),
    }

    let err = driftpack::remove::remove(&fx.target, &local_options()).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(err.conflicts(), [p("etc/app.conf")]);
    assert!(conf.exists());

    let report = driftpack::remove::remove(&fx.target, &forced()).unwrap();
    assert!(report.removed_files.contains(&p("etc/app.conf")));
    assert!(!conf.exists());
}

#[test]
fn test_reverse_diff_swaps_sides() {
    let fx = Fixture::new("widget");
    let archive = fx.open("1.0");
    fx.install(&archive);
    fs::write(fx.target_file("src/a.txt"), "hello, local\n").unwrap();

    let reverse = driftpack::Options {
        reverse: true,
        ..local_options()
    };
    let diffs = diff::diff(&archive, &fx.target, &[p("src/a.txt")], &reverse, &BuiltinDiff).unwrap();
    let text = diffs[0].to_string();
    assert!(text.starts_with("--- b/src/a.txt\n+++ a/src/a.txt\n"));
    assert!(text.contains("-hello, local"));
    assert!(text.contains("+hello"));
}

#[test]
fn test_binary_files_are_not_diffed() {
    let fx = Fixture::new("widget");
    let archive = fx.open("1.0");
    fx.install(&archive);
    fs::write(fx.target_file("share/logo.bin"), [0u8, 1, 2, 3]).unwrap();

    let diffs = diff::diff(&archive, &fx.target, &[], &local_options(), &BuiltinDiff).unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(
        diffs[0].to_string(),
        "Binary files a/share/logo.bin and b/share/logo.bin differ\n"
    );
}

#[test]
fn test_non_utf8_text_is_treated_as_binary() {
    let fx = Fixture::new("widget");
    let archive = fx.open("1.0");
    fx.install(&archive);
    fs::write(fx.target_file("etc/app.conf"), b"port = 8080\nname = caf\xe9\n").unwrap();

    let diffs = diff::diff(&archive, &fx.target, &[], &local_options(), &BuiltinDiff).unwrap();
    assert_eq!(
        diffs,
        [FileDiff::Binary {
            old_label: "a/etc/app.conf".to_string(),
            new_label: "b/etc/app.conf".to_string(),
        }]
    );
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_never_followed() {
    let fx = Fixture::new("widget");
    std::os::unix::fs::symlink("sub", fx.source.join("src/sub-link")).unwrap();
    let archive = fx.open("1.0");
    assert!(archive.manifest().unwrap().lookup(&p("src/sub-link")).is_none());
    fx.install(&archive);
    assert!(fs::symlink_metadata(fx.target_file("src/sub-link")).is_err());

    // A recorded file replaced by a dangling link is drift, not an error
    let conf = fx.target_file("etc/app.conf");
    fs::remove_file(&conf).unwrap();
    std::os::unix::fs::symlink("missing.conf", &conf).unwrap();

    let report = status::status(&fx.target).unwrap();
    assert!(report.contains(&(p("etc/app.conf"), Classification::LocallyModified)));

    let files = [p("etc/app.conf")];
    let diffs = diff::diff(&archive, &fx.target, &files, &local_options(), &BuiltinDiff).unwrap();
    assert_eq!(diffs, [FileDiff::LinkOnDisk(p("etc/app.conf"))]);
    assert_eq!(diffs[0].to_string(), "./etc/app.conf: symbolic link on disk\n");

    let err = driftpack::remove::remove(&fx.target, &local_options()).unwrap_err();
    assert_eq!(err.conflicts(), [p("etc/app.conf")]);
    driftpack::remove::remove(&fx.target, &forced()).unwrap();
    assert!(fs::symlink_metadata(&conf).is_err());
}

#[test]
fn test_diff_requested_paths() {
    let fx = Fixture::new("widget");
    let archive = fx.open("1.0");
    fx.install(&archive);
    fs::remove_file(fx.target_file("src/a.txt")).unwrap();

    let files = [p("src/a.txt"), p("not/packaged"), p(CHECKSUMS_ENTRY)];
    let diffs = diff::diff(&archive, &fx.target, &files, &local_options(), &BuiltinDiff).unwrap();
    assert_eq!(
        diffs,
        [FileDiff::NotFound(p("src/a.txt")), FileDiff::NotInPackage(p("not/packaged"))]
    );
}

#[test]
fn test_name_mismatch_with_force() {
    let foo = Fixture::new("foo");
    let bar = Fixture::new("bar");
    foo.install(&foo.open("1.0"));

    // Same target, different package
    let err = driftpack::install::install(&bar.open("1.0"), &foo.target, &forced()).unwrap_err();
    match err {
        Error::NameMismatch { installed, incoming } => {
            assert_eq!(installed, "foo");
            assert_eq!(incoming, "bar");
        }
        other => panic!("expected NameMismatch, got {}", other),
    }
}

#[test]
fn test_upgrade_keeps_dropped_files() {
    let fx = Fixture::new("widget");
    fx.install(&fx.open("1.0"));

    fx.spec("+src\n");
    fs::write(fx.source.join("src/a.txt"), "hello v2").unwrap();
    let report = driftpack::install::install(&fx.open("2.0"), &fx.target, &local_options()).unwrap();
    assert_eq!(report.version, "2.0");

    assert_eq!(fs::read_to_string(fx.target_file("src/a.txt")).unwrap(), "hello v2");
    // No longer packaged, still on disk, now unknown
    assert!(fx.target_file("etc/app.conf").exists());
    let report = status::status(&fx.target).unwrap();
    assert!(report.contains(&(p("etc/app.conf"), Classification::UnknownToPackage)));
}

#[test]
fn test_conflicting_upgrade_leaves_target_untouched() {
    let fx = Fixture::new("widget");
    fx.install(&fx.open("1.0"));
    fs::write(fx.target_file("src/a.txt"), "local edit").unwrap();
    fs::write(fx.source.join("src/a.txt"), "upstream edit").unwrap();
    fs::write(fx.source.join("src/sub/b.txt"), "world v2").unwrap();

    let err = driftpack::install::install(&fx.open("2.0"), &fx.target, &local_options()).unwrap_err();
    assert_eq!(err.conflicts(), [p("src/a.txt")]);
    assert_eq!(fs::read_to_string(fx.target_file("src/sub/b.txt")).unwrap(), "world");
    assert_eq!(fs::read_to_string(fx.target_file("src/a.txt")).unwrap(), "local edit");
}

#[test]
fn test_remove_cleans_up_target() {
    let fx = Fixture::new("widget");
    fx.install(&fx.open("1.0"));

    let report = driftpack::remove::remove(&fx.target, &local_options()).unwrap();
    assert!(report.warnings.is_empty());
    assert!(!fx.target_file("src/a.txt").exists());
    assert!(!fx.target.join(CHECKSUMS_ENTRY).exists());

    // Only the empty, unrecorded walk roots remain
    let mut left: Vec<String> = fs::read_dir(&fx.target)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, ["etc", "share", "src"]);

    let attempted: Vec<&str> = report.attempted_dirs.iter().map(|p| p.as_str()).collect();
    assert_eq!(attempted, ["src/sub"]);
}

#[test]
fn test_remove_directory_order() {
    let fx = Fixture::new("nested");
    fx.spec("+.\n-src\n-etc\n-share\n");
    common::write_file(&fx.source, "a/b/c/deep.txt", "deep");

    fx.install(&fx.open("1.0"));
    let report = driftpack::remove::remove(&fx.target, &local_options()).unwrap();

    let attempted: Vec<&str> = report.attempted_dirs.iter().map(|p| p.as_str()).collect();
    assert_eq!(attempted, ["a/b/c", "a/b", "a"]);
    assert!(!fx.target_file("a").exists());
}
