//! `cinder resolve` command implementation.
//!
//! Runs the full pipeline for the selected contexts, selecting missing
//! dependencies wherever exactly one candidate satisfies them, then
//! writes one build description per cleanly resolved context and brings
//! `cinder.lock` in line with the packs the solution actually uses.

use std::fs;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cinder_config::lock::{write_lock, LockFile, LockedPack, LOCK_FILE_NAME};
use cinder_resolver::{Context, ContextVerdict, Session};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::{absolute, open_session, CommandContext};
use crate::output::report;

/// Execute the `cinder resolve` command
pub fn execute(
    solution: &Utf8Path,
    context: Option<&str>,
    locked: bool,
    pack_roots: &[Utf8PathBuf],
    ctx: &CommandContext,
) -> Result<ExitCode> {
    let start = Instant::now();
    let path = absolute(solution, &ctx.cwd);
    ctx.output.step("🧩", &format!("Resolving {path}"));

    let mut session = open_session(pack_roots, Some(&path), ctx)?;
    let lock_path = path
        .parent()
        .map(|dir| dir.join(LOCK_FILE_NAME))
        .context("solution path has no parent directory")?;
    if locked && session.lock().is_none() {
        bail!("'{lock_path}' not found (required by --locked)");
    }

    let verdicts = session.resolve(context)?;
    let summary = report::render_contexts(&session, &verdicts, &ctx.output);

    let mut written = 0;
    for verdict in &verdicts {
        let clean = verdict.report.as_ref().is_some_and(|r| r.is_clean());
        if verdict.failed || !clean {
            continue;
        }
        let Some(found) = session.contexts().iter().find(|c| c.name == verdict.name) else {
            continue;
        };
        let out_path = description_path(&path, &verdict.name)?;
        write_build_description(found, verdict, &path, &out_path)?;
        ctx.output.info(&format!("  wrote {out_path}"));
        written += 1;
    }

    if summary.failed > 0 {
        ctx.output
            .warn("cinder.lock left untouched (not every context resolved)");
    } else if context.is_some() {
        ctx.output
            .info("cinder.lock left untouched (single-context run)");
    } else if !verdicts.is_empty() {
        update_lock(&session, &lock_path, locked, ctx)?;
    }

    let duration = start.elapsed();
    if summary.ok() {
        ctx.output.success(&format!(
            "{} context(s) resolved, {} build description(s) written in {:.2}s",
            verdicts.len(),
            written,
            duration.as_secs_f64()
        ));
        Ok(ExitCode::SUCCESS)
    } else {
        ctx.output.error(&summary.describe());
        Ok(ExitCode::FAILURE)
    }
}

fn description_path(solution_path: &Utf8Path, context_name: &str) -> Result<Utf8PathBuf> {
    let dir = solution_path
        .parent()
        .context("solution path has no parent directory")?;
    Ok(dir.join(format!("{context_name}.cbuild.json")))
}

/// Write the resolved state of one context as a build description
fn write_build_description(
    context: &Context,
    verdict: &ContextVerdict,
    solution_path: &Utf8Path,
    out_path: &Utf8Path,
) -> Result<()> {
    let description = build_description(context, verdict, solution_path)?;
    let mut text = serde_json::to_string_pretty(&description)
        .context("failed to encode the build description")?;
    text.push('\n');
    fs::write(out_path.as_std_path(), text)
        .with_context(|| format!("failed to write '{out_path}'"))?;
    Ok(())
}

/// Assemble the JSON document describing one resolved context
fn build_description(
    context: &Context,
    verdict: &ContextVerdict,
    solution_path: &Utf8Path,
) -> Result<Value> {
    let mut build = Map::new();
    build.insert("context".into(), json!(context.name));
    build.insert("solution".into(), json!(solution_path.as_str()));

    if let Some(target) = &context.target {
        build.insert("device".into(), json!(target.device.to_string()));
        if let Some(board) = &target.board {
            build.insert("board".into(), json!(board.to_string()));
        }
        if let Some(variant) = &target.variant {
            build.insert("device-variant".into(), json!(variant));
        }
        let attributes: Map<String, Value> = target
            .attributes
            .iter()
            .map(|(key, value)| (key.to_string(), json!(value)))
            .collect();
        build.insert("target-attributes".into(), Value::Object(attributes));
    }

    let packs: Vec<Value> = context
        .used_packs()
        .iter()
        .map(|pack| {
            json!({
                "pack": pack.id.to_string(),
                "selected-by": pack.selected_by,
            })
        })
        .collect();
    build.insert("packs".into(), Value::Array(packs));

    let mut components = Vec::new();
    if let Some(pool) = &context.pool {
        for used in pool.used() {
            let mut entry = Map::new();
            entry.insert("component".into(), json!(used.id.to_string()));
            entry.insert("from-pack".into(), json!(used.pack_id.to_string()));
            entry.insert("selected-by".into(), json!(used.selected_by));
            if used.count > 1 {
                entry.insert("instances".into(), json!(used.count));
            }
            components.push(Value::Object(entry));
        }
    }
    build.insert("components".into(), Value::Array(components));

    if !context.layers.is_empty() {
        let layers: Map<String, Value> = context
            .layers
            .iter()
            .map(|(layer_type, file)| (layer_type.clone(), json!(file)))
            .collect();
        build.insert("layers".into(), Value::Object(layers));
    }

    if let Some(report) = &verdict.report {
        let value =
            serde_json::to_value(report).context("failed to encode the dependency report")?;
        build.insert("dependencies".into(), value);
    }

    let mut root = Map::new();
    root.insert("build".into(), Value::Object(build));
    Ok(Value::Object(root))
}

/// Bring `cinder.lock` in line with the packs the contexts use.
///
/// The union keeps first-use order across contexts. An unchanged pack
/// set leaves the file untouched, so repeated runs do not churn the
/// generation timestamp.
fn update_lock(
    session: &Session,
    lock_path: &Utf8Path,
    locked: bool,
    ctx: &CommandContext,
) -> Result<()> {
    let mut pinned: IndexMap<String, LockedPack> = IndexMap::new();
    for context in session.contexts() {
        for entry in context.used_packs() {
            let pack = pinned
                .entry(entry.id.to_string())
                .or_insert_with(|| LockedPack {
                    id: entry.id.clone(),
                    selected_by: Vec::new(),
                });
            for text in &entry.selected_by {
                if !pack.selected_by.contains(text) {
                    pack.selected_by.push(text.clone());
                }
            }
        }
    }
    let packs: Vec<LockedPack> = pinned.into_values().collect();
    if packs.is_empty() {
        return Ok(());
    }

    if session.lock().is_some_and(|lock| lock.packs == packs) {
        ctx.output.info(&format!("{lock_path} is up to date"));
        return Ok(());
    }
    if locked {
        bail!("'{lock_path}' is out of date (refusing to update with --locked)");
    }
    let lock = LockFile {
        generated: None,
        packs,
    };
    write_lock(&lock, lock_path)?;
    ctx.output.info(&format!("  wrote {lock_path}"));
    Ok(())
}
