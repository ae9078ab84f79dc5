// src/main.rs

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, GlobalArgs};
use driftpack::{Options, Settings};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Settings file, then environment, then flags
fn build_options(global: &GlobalArgs) -> Result<Options> {
    let settings = Settings::load_default()
        .context("Failed to load settings")?
        .with_env(|key| std::env::var(key).ok());
    let mut options = settings.into_options().context("Invalid settings")?;

    options.force = global.force;
    options.reverse = global.reverse;
    if let Some(vcs) = &global.vcs {
        options.vcs = vcs.parse().context("Invalid --vcs value")?;
    }
    if let Some(tool) = &global.diff_tool {
        options.diff_backend = tool.parse().context("Invalid --diff-tool value")?;
    }
    Ok(options)
}

fn run(cli: Cli) -> Result<()> {
    let options = build_options(&cli.global)?;

    match cli.command {
        Commands::Package { module, tag } => commands::cmd_package(&module, &tag, &options),
        Commands::Install { location, target } => commands::cmd_install(&location, &target, &options),
        Commands::Remove { target } => commands::cmd_remove(&target, &options),
        Commands::List { location } => commands::cmd_list(&location),
        Commands::Diff {
            location,
            paths,
            target,
        } => commands::cmd_diff(&location, &paths, &target, &options),
        Commands::Status { target } => commands::cmd_status(&target),
        Commands::Info { location } => commands::cmd_info(&location),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.global.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(err) = e.downcast_ref::<driftpack::Error>() {
                for path in err.conflicts() {
                    eprintln!("  conflict: {}", path);
                }
            }
            ExitCode::FAILURE
        }
    }
}
