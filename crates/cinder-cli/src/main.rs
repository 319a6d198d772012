//! # cinder-cli
//!
//! Command-line front end for the cinder build-configuration resolver.
//!
//! This is the main entry point for the `cinder` binary. It handles command
//! parsing, sets up logging and the panic handler, and dispatches to the
//! command handlers.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

mod commands;
mod output;

/// Build-configuration resolver for component-based firmware projects
#[derive(Parser)]
#[command(name = "cinder", version, about = "Build-configuration resolver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List installed packs, devices, boards, components, layers or contexts
    List {
        #[arg(value_enum)]
        kind: ListKind,
        /// Wildcard filter applied to the listed identifiers
        #[arg(short, long, default_value = "")]
        filter: String,
        /// Solution file scoping the listing
        #[arg(short, long)]
        solution: Option<Utf8PathBuf>,
        /// Installed-pack root directory
        #[arg(long = "pack-root", env = "CINDER_PACK_ROOT")]
        pack_roots: Vec<Utf8PathBuf>,
    },
    /// Validate component dependencies of every build context
    Validate {
        /// Solution file to validate
        #[arg(short, long)]
        solution: Utf8PathBuf,
        /// Only process the named context, e.g. `app.Debug+TypeA`
        #[arg(short, long)]
        context: Option<String>,
        /// Installed-pack root directory
        #[arg(long = "pack-root", env = "CINDER_PACK_ROOT")]
        pack_roots: Vec<Utf8PathBuf>,
    },
    /// Resolve every build context and write its build description
    Resolve {
        /// Solution file to resolve
        #[arg(short, long)]
        solution: Utf8PathBuf,
        /// Only process the named context, e.g. `app.Debug+TypeA`
        #[arg(short, long)]
        context: Option<String>,
        /// Fail instead of updating cinder.lock when it is missing or stale
        #[arg(long)]
        locked: bool,
        /// Installed-pack root directory
        #[arg(long = "pack-root", env = "CINDER_PACK_ROOT")]
        pack_roots: Vec<Utf8PathBuf>,
    },
    /// Show version information
    Version,
}

/// What `cinder list` enumerates
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListKind {
    Packs,
    Devices,
    Boards,
    Components,
    Layers,
    Contexts,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);
    setup_panic_handler();

    match commands::run_cli(cli) {
        Ok(code) => code,
        Err(error) => {
            output::render_failure(&error);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!("cinder={level},cinder_resolver={level},cinder_registry={level}")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("cinder encountered an unexpected error: {}", panic_info);
        eprintln!("cinder crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/cinder-build/cinder/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
