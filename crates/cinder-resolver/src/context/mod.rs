//! Per-build-context state and diagnostics
//!
//! One [`Context`] exists per (project, build-type, target-type) pairing.
//! It accumulates the outputs of every resolution stage plus an ordered,
//! append-only diagnostic log. Contexts share no mutable state; the only
//! cross-context concern is printing, which goes through [`SharedLog`].

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use cinder_config::ProjectFile;

use crate::components::ComponentPool;
use crate::packs::ResolvedPackRef;
use crate::target::ResolvedTarget;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One entry in a context's log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Ordered, append-only diagnostic log for one context
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity == Severity::Error)
    }

    /// Messages at exactly the given severity, in log order
    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.severity == severity)
            .map(|e| e.message.as_str())
            .collect()
    }
}

/// Print sink shared by all contexts of a batch.
///
/// A context's entries are flushed as one block under the lock, so two
/// contexts never interleave partial output.
#[derive(Debug, Clone, Default)]
pub struct SharedLog {
    inner: Arc<Mutex<Vec<String>>>,
}

impl SharedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flush one context's log as a single block
    pub fn flush_context(&self, context_name: &str, diagnostics: &Diagnostics) {
        let mut lines = Vec::with_capacity(diagnostics.entries().len());
        for entry in diagnostics.entries() {
            lines.push(format!("{}: {}: {}", context_name, entry.severity, entry.message));
        }
        let mut inner = self.inner.lock();
        inner.extend(lines);
    }

    /// All flushed lines so far
    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().clone()
    }
}

/// Reference counting for a pack pulled in by component selection
#[derive(Debug, Clone, Default)]
pub struct PackRefState {
    /// Number of selected components currently using the pack
    pub users: u32,

    /// Marked for removal at the next `apply`
    pub removable: bool,
}

/// Mutable state of one build context
#[derive(Debug)]
pub struct Context {
    /// Context name, `<project>.<build-type>+<target-type>`
    pub name: String,

    /// The project this context builds
    pub project: ProjectFile,

    pub target_type: String,
    pub build_type: String,

    /// Ordered diagnostic log
    pub diagnostics: Diagnostics,

    /// Packs resolved for this context, in selection order
    pub packs: Vec<ResolvedPackRef>,

    /// Pack references added by interactive component selection
    pub pack_refs: IndexMap<String, PackRefState>,

    /// Resolved device/board/attribute state
    pub target: Option<ResolvedTarget>,

    /// Component candidate pool with selection state
    pub pool: Option<ComponentPool>,

    /// Layer file chosen per layer type, once composition settled
    pub layers: IndexMap<String, String>,

    /// Set when a fatal diagnostic excluded this context from output
    pub failed: bool,
}

impl Context {
    pub fn new(project: ProjectFile, build_type: &str, target_type: &str) -> Self {
        let name = Self::context_name(&project.name, build_type, target_type);
        Self {
            name,
            project,
            target_type: target_type.to_string(),
            build_type: build_type.to_string(),
            diagnostics: Diagnostics::new(),
            packs: Vec::new(),
            pack_refs: IndexMap::new(),
            target: None,
            pool: None,
            layers: IndexMap::new(),
            failed: false,
        }
    }

    pub fn context_name(project: &str, build_type: &str, target_type: &str) -> String {
        let mut name = project.to_string();
        if !build_type.is_empty() {
            name.push('.');
            name.push_str(build_type);
        }
        name.push('+');
        name.push_str(target_type);
        name
    }

    /// Exclude this context from output; the caller has already logged
    /// the reason
    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// Packs the configuration actually depends on: those pinned by a
    /// declared requirement plus those referenced through component
    /// selection. A reference marked removable still counts until the
    /// next `apply` purges it.
    pub fn used_packs(&self) -> Vec<&ResolvedPackRef> {
        self.packs
            .iter()
            .filter(|entry| {
                !entry.selected_by.is_empty() || self.pack_refs.contains_key(&entry.id.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn project(name: &str) -> ProjectFile {
        ProjectFile {
            path: Utf8PathBuf::from(format!("{name}.project.toml")),
            name: name.to_string(),
            device: None,
            board: None,
            compiler: None,
            attributes: Default::default(),
            components: Vec::new(),
            connects: Vec::new(),
            layers: Vec::new(),
        }
    }

    #[test]
    fn test_context_naming() {
        assert_eq!(Context::context_name("core", "Debug", "CM0"), "core.Debug+CM0");
        assert_eq!(Context::context_name("core", "", "CM0"), "core+CM0");
    }

    #[test]
    fn test_diagnostics_order_and_errors() {
        let mut log = Diagnostics::new();
        log.info("first");
        log.warning("second");
        assert!(!log.has_errors());
        log.error("third");
        assert!(log.has_errors());
        let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(log.messages(Severity::Warning), vec!["second"]);
    }

    #[test]
    fn test_shared_log_flushes_whole_blocks() {
        let shared = SharedLog::new();
        let mut a = Diagnostics::new();
        a.info("one");
        a.info("two");
        let mut b = Diagnostics::new();
        b.error("boom");

        shared.flush_context("core.Debug+CM0", &a);
        shared.flush_context("core.Release+CM0", &b);

        let lines = shared.lines();
        assert_eq!(
            lines,
            vec![
                "core.Debug+CM0: info: one",
                "core.Debug+CM0: info: two",
                "core.Release+CM0: error: boom",
            ]
        );
    }

    #[test]
    fn test_fail_marks_context() {
        let mut context = Context::new(project("core"), "Debug", "CM0");
        assert!(!context.failed);
        context.diagnostics.error("missing device and/or board info");
        context.fail();
        assert!(context.failed);
        assert!(context.diagnostics.has_errors());
    }
}
