//! Per-context rendering of diagnostics and dependency reports.
//!
//! Context messages are flushed through the shared log first, so each
//! context's lines come out grouped and never interleaved with a
//! sibling's.

use cinder_resolver::{ContextVerdict, Session, SharedLog, ValidationReport};

use super::OutputHandler;

/// Tallies over the rendered contexts
#[derive(Debug, Default)]
pub struct RenderSummary {
    /// Contexts that failed before or during validation
    pub failed: usize,

    /// Contexts whose dependency verdict still needs attention
    pub unresolved: usize,

    /// Contexts with error diagnostics
    pub errors: usize,
}

impl RenderSummary {
    pub fn ok(&self) -> bool {
        self.failed == 0 && self.unresolved == 0 && self.errors == 0
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.failed > 0 {
            parts.push(format!("{} context(s) failed to resolve", self.failed));
        }
        if self.unresolved > 0 {
            parts.push(format!(
                "{} context(s) have unresolved dependencies",
                self.unresolved
            ));
        }
        if self.errors > 0 && self.failed == 0 {
            parts.push(format!("{} context(s) reported errors", self.errors));
        }
        if parts.is_empty() {
            "all contexts are clean".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Render each verdict's diagnostics and dependency report
pub fn render_contexts(
    session: &Session,
    verdicts: &[ContextVerdict],
    output: &OutputHandler,
) -> RenderSummary {
    let log = SharedLog::new();
    let mut summary = RenderSummary::default();

    for verdict in verdicts {
        let context = session.contexts().iter().find(|c| c.name == verdict.name);
        if let Some(context) = context {
            log.flush_context(&context.name, &context.diagnostics);
            if context.diagnostics.has_errors() {
                summary.errors += 1;
            }
        }
        if verdict.failed {
            summary.failed += 1;
        }
    }
    for line in log.lines() {
        print_log_line(&line, output);
    }

    for verdict in verdicts {
        if verdict.failed {
            output.error(&format!("context '{}' failed to resolve", verdict.name));
            continue;
        }
        if let Some(report) = &verdict.report {
            render_report(&verdict.name, report, output);
            if !report.is_clean() {
                summary.unresolved += 1;
            }
        }
    }
    summary
}

/// Dependency verdict for one context, with its unmet rules
fn render_report(name: &str, report: &ValidationReport, output: &OutputHandler) {
    if report.is_clean() {
        output.success(&format!("{}: dependencies {}", name, report.overall.as_str()));
        return;
    }
    output.warn(&format!("{}: dependencies {}", name, report.overall.as_str()));
    for component in report.unmet_components() {
        output.warn(&format!("  {}: {}", component.id, component.result.as_str()));
        for rule in &component.unmet {
            output.info(&format!("    {}", rule.expression));
            for aggregate in &rule.aggregates {
                output.info(&format!("      candidate: {}", aggregate));
            }
        }
    }
}

/// Route one flushed log line by its severity marker
fn print_log_line(line: &str, output: &OutputHandler) {
    if line.contains(": error: ") {
        output.error(line);
    } else if line.contains(": warning: ") {
        output.warn(line);
    } else {
        output.info(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_ok_only_when_all_counts_are_zero() {
        let mut summary = RenderSummary::default();
        assert!(summary.ok());
        summary.unresolved = 1;
        assert!(!summary.ok());
    }

    #[test]
    fn test_summary_describes_each_tally() {
        let summary = RenderSummary {
            failed: 2,
            unresolved: 1,
            errors: 2,
        };
        let text = summary.describe();
        assert!(text.contains("2 context(s) failed to resolve"));
        assert!(text.contains("1 context(s) have unresolved dependencies"));
    }
}
