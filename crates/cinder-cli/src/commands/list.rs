//! `cinder list` command implementation.
//!
//! Enumerates installed packs, devices, boards and components, discovered
//! layers, or the build contexts a solution derives, optionally narrowed
//! by a wildcard filter. Lines go to stdout, one entry per line.

use std::process::ExitCode;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};

use super::{open_session, CommandContext};
use crate::ListKind;

/// Execute the `cinder list` command
pub fn execute(
    kind: ListKind,
    filter: &str,
    solution: Option<&Utf8Path>,
    pack_roots: &[Utf8PathBuf],
    ctx: &CommandContext,
) -> Result<ExitCode> {
    let session = open_session(pack_roots, solution, ctx)?;

    let lines = match kind {
        ListKind::Packs => session.list_packs(filter)?,
        ListKind::Devices => session.list_devices(filter)?,
        ListKind::Boards => session.list_boards(filter)?,
        ListKind::Components => session.list_components(filter)?,
        ListKind::Layers => session.list_layers(filter)?,
        ListKind::Contexts => session.list_contexts(filter)?,
    };
    for line in &lines {
        println!("{line}");
    }
    Ok(ExitCode::SUCCESS)
}
