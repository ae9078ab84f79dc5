// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: package location
fn location_arg() -> Arg {
    Arg::new("location")
        .required(true)
        .value_name("LOCATION")
        .help("Package file path or URL (http, https, ftp, ssh, sftp)")
}

/// Common argument: target directory
fn target_arg() -> Arg {
    Arg::new("target")
        .default_value(".")
        .value_name("DIR")
        .help("Target directory")
}

fn build_cli() -> Command {
    Command::new("driftpack")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Driftpack Contributors")
        .about("Package directory trees and detect drift against their checksums")
        .subcommand_required(true)
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Proceed even when locally modified files would be affected"),
        )
        .arg(
            Arg::new("reverse")
                .short('R')
                .long("reverse")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Swap old and new sides when diffing"),
        )
        .arg(
            Arg::new("vcs")
                .long("vcs")
                .global(true)
                .value_name("KIND")
                .help("VCS used to check out sources: cvs, svn, git, hg or local"),
        )
        .arg(
            Arg::new("diff_tool")
                .long("diff-tool")
                .global(true)
                .value_name("TOOL")
                .help("Diff implementation: auto, builtin or external"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output (repeat for debug)"),
        )
        .subcommand(
            Command::new("package")
                .about("Build a package from a module at a tag")
                .arg(Arg::new("module").required(true).help("Module location"))
                .arg(Arg::new("tag").required(true).help("Tag to check out; also the package version")),
        )
        .subcommand(
            Command::new("install")
                .about("Install a package into a directory")
                .arg(location_arg())
                .arg(target_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove the package installed in a directory")
                .arg(target_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List the files in a package")
                .arg(location_arg()),
        )
        .subcommand(
            Command::new("diff")
                .about("Show differences between a package and an installed tree")
                .arg(location_arg())
                .arg(Arg::new("paths").num_args(0..).help("Paths to compare"))
                .arg(
                    Arg::new("target")
                        .short('t')
                        .long("target")
                        .default_value(".")
                        .help("Directory to compare against"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Classify every path in a directory against its installed package")
                .arg(target_arg()),
        )
        .subcommand(
            Command::new("info")
                .about("Show package name, version and metadata")
                .arg(location_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("driftpack.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
