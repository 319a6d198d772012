//! `cinder validate` command implementation.
//!
//! Runs the preparation pipeline for the selected contexts and reports
//! the dependency verdict of each without changing any selection.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};

use super::{absolute, open_session, CommandContext};
use crate::output::report;

/// Execute the `cinder validate` command
pub fn execute(
    solution: &Utf8Path,
    context: Option<&str>,
    pack_roots: &[Utf8PathBuf],
    ctx: &CommandContext,
) -> Result<ExitCode> {
    let start = Instant::now();
    let path = absolute(solution, &ctx.cwd);
    ctx.output.step("🔍", &format!("Validating {path}"));

    let mut session = open_session(pack_roots, Some(&path), ctx)?;
    let verdicts = session.validate(context)?;
    let summary = report::render_contexts(&session, &verdicts, &ctx.output);

    let duration = start.elapsed();
    if summary.ok() {
        ctx.output.success(&format!(
            "{} context(s) validated in {:.2}s",
            verdicts.len(),
            duration.as_secs_f64()
        ));
        Ok(ExitCode::SUCCESS)
    } else {
        ctx.output.error(&summary.describe());
        Ok(ExitCode::FAILURE)
    }
}
