//! Command implementations and dispatch logic.
//!
//! Each command is a function taking its parsed arguments and the shared
//! [`CommandContext`]; [`run_cli`] builds the context and dispatches.

use std::process::ExitCode;

use anyhow::{anyhow, bail, Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cinder_resolver::Session;
use tracing::{debug, info};

pub mod list;
pub mod resolve;
pub mod validate;

#[cfg(test)]
mod tests;

use crate::output::OutputHandler;
use crate::{Cli, Commands};

/// Shared state for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Create a command context rooted in the current directory
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get the current directory")?;
        let cwd = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|path| anyhow!("current directory is not UTF-8: {}", path.display()))?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
        })
    }
}

/// Dispatch the parsed command line to its handler
pub fn run_cli(cli: Cli) -> Result<ExitCode> {
    let ctx = CommandContext::new()?;

    match cli.command {
        Commands::List {
            kind,
            filter,
            solution,
            pack_roots,
        } => {
            info!("Listing {:?} (filter: {:?})", kind, filter);
            list::execute(kind, &filter, solution.as_deref(), &pack_roots, &ctx)
        }
        Commands::Validate {
            solution,
            context,
            pack_roots,
        } => {
            info!("Validating solution: {}", solution);
            validate::execute(&solution, context.as_deref(), &pack_roots, &ctx)
        }
        Commands::Resolve {
            solution,
            context,
            locked,
            pack_roots,
        } => {
            info!("Resolving solution: {} (locked: {})", solution, locked);
            resolve::execute(&solution, context.as_deref(), locked, &pack_roots, &ctx)
        }
        Commands::Version => show_version(&ctx),
    }
}

/// Load the installed packs, and the solution when one is given, into a
/// fresh session
pub fn open_session(
    pack_roots: &[Utf8PathBuf],
    solution: Option<&Utf8Path>,
    ctx: &CommandContext,
) -> Result<Session> {
    if pack_roots.is_empty() {
        bail!("no pack root given; pass --pack-root or set CINDER_PACK_ROOT");
    }
    let roots: Vec<Utf8PathBuf> = pack_roots
        .iter()
        .map(|root| absolute(root, &ctx.cwd))
        .collect();

    let mut session = Session::new();
    let count = session
        .load_packs(&roots)
        .context("failed to scan the pack roots")?;
    debug!("indexed {} installed pack(s)", count);

    if let Some(path) = solution {
        let path = absolute(path, &ctx.cwd);
        let contexts = session
            .load_solution(&path)
            .with_context(|| format!("failed to load solution '{path}'"))?;
        debug!("derived {} build context(s)", contexts);
    }
    Ok(session)
}

/// Resolve `path` against the working directory
pub fn absolute(path: &Utf8Path, cwd: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        cwd.join(path)
    }
}

fn show_version(ctx: &CommandContext) -> Result<ExitCode> {
    let version = env!("CARGO_PKG_VERSION");
    let build_date = env!("BUILD_DATE");
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    ctx.output.info(&format!("cinder v{version}"));
    ctx.output.info(&format!("Built: {build_date}"));
    ctx.output.info(&format!("Target: {target}"));
    ctx.output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));

    Ok(ExitCode::SUCCESS)
}
