//! Interactive resolution sessions.
//!
//! A [`Session`] ties together everything one run works with: the
//! installed-pack index, a loaded solution with its member projects,
//! discovered layers and the lock file, and one [`Context`] per
//! project, build-type and target-type combination. Interactive
//! operations (component, pack, bundle and variant selection) address
//! the active context; [`Session::validate`] and [`Session::resolve`]
//! drive all contexts, or a named one, in a single call.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use cinder_config::layers::load_layer;
use cinder_config::lock::{read_lock, LOCK_FILE_NAME};
use cinder_config::{
    collect_board, collect_compiler, collect_device, discover_layers, load_project, ConfigError,
    LayerFile, Leveled, LockFile, ProjectFile, SolutionFile, TargetType, ToolchainItem,
};
use cinder_core::utils::apply_filter;
use cinder_core::{BoardSpec, ComponentId, ComponentQuery, DeviceSpec, PackId, PackRequirement};
use cinder_registry::{load_pack_roots, LoadNote, NoteSeverity, Pack, PackIndex};

use crate::components::ComponentPool;
use crate::connections::{solve_connections, ConnectItem, LayerCandidate, LayerSlot};
use crate::context::{Context, Diagnostics, PackRefState, Severity};
use crate::dependencies::{self, ValidationReport};
use crate::packs::{resolve_packs, PackPolicy, ResolvedPackRef};
use crate::target::{resolve_target, AttrOverride, TargetInput};
use crate::{ResolverError, ResolverResult};

/// Outcome of validating or resolving one context
#[derive(Debug, Clone)]
pub struct ContextVerdict {
    /// Context name, `project.build+target`
    pub name: String,

    /// The context failed before or during validation
    pub failed: bool,

    /// Dependency report; `None` when the context failed earlier
    pub report: Option<ValidationReport>,
}

/// Stateful facade over pack loading, context preparation and
/// component selection.
///
/// Contexts are prepared lazily: loading packs or a solution only
/// derives them, and the pipeline (pack resolution, target resolution,
/// pool construction, layer composition) runs the first time a context
/// is used. Reloading either input resets every context.
#[derive(Debug, Default)]
pub struct Session {
    index: PackIndex,
    notes: Vec<LoadNote>,
    solution: Option<SolutionFile>,
    projects: Vec<ProjectFile>,
    layers: Vec<LayerFile>,
    lock: Option<LockFile>,
    contexts: Vec<Context>,
    active: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The installed-pack index the session works against
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    pub fn solution(&self) -> Option<&SolutionFile> {
        self.solution.as_ref()
    }

    /// Lock file found next to the solution, if any
    pub fn lock(&self) -> Option<&LockFile> {
        self.lock.as_ref()
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }

    /// Scan `roots` for installed packs and rebuild the index.
    ///
    /// Load notes are kept and replayed into each context when it is
    /// prepared, so problems with the installation surface per context.
    /// Every context is reset; selections made against the previous
    /// index are dropped. Returns the number of packs loaded.
    pub fn load_packs(&mut self, roots: &[Utf8PathBuf]) -> ResolverResult<usize> {
        let outcome = load_pack_roots(roots);
        let count = outcome.packs.len();
        debug!("loaded {count} pack(s) from {} root(s)", roots.len());
        self.index = PackIndex::new(outcome.packs);
        self.notes = outcome.notes;
        self.reset_contexts();
        Ok(count)
    }

    /// Load a solution with its member projects, lock file and
    /// discoverable layers, then derive the build contexts.
    ///
    /// Session state is only replaced once every file has loaded; a
    /// failed load leaves the previous solution intact. Returns the
    /// number of contexts derived.
    pub fn load_solution(&mut self, path: &Utf8Path) -> ResolverResult<usize> {
        let solution = cinder_config::load_solution(path)?;
        let lock = read_lock(&solution.dir().join(LOCK_FILE_NAME))?;
        let layers = discover_layers(&solution.resolved_layer_paths())?;
        let mut projects = Vec::with_capacity(solution.projects.len());
        for project_path in solution.resolved_projects() {
            projects.push(load_project(&project_path)?);
        }
        self.solution = Some(solution);
        self.lock = lock;
        self.layers = layers;
        self.projects = projects;
        self.reset_contexts();
        Ok(self.contexts.len())
    }

    fn reset_contexts(&mut self) {
        self.contexts = match &self.solution {
            Some(solution) => derive_contexts(solution, &self.projects),
            None => Vec::new(),
        };
        self.active = 0;
    }

    /// Make `name` the context that interactive operations address
    pub fn activate(&mut self, name: &str) -> ResolverResult<()> {
        match self.contexts.iter().position(|c| c.name == name) {
            Some(position) => {
                self.active = position;
                Ok(())
            }
            None => Err(ResolverError::operation(format!(
                "context '{name}' was not found"
            ))),
        }
    }

    /// Select `count` instances of the component named by `identifier`
    /// in the active context. A count of zero deselects.
    pub fn select_component(
        &mut self,
        identifier: &str,
        count: u32,
    ) -> ResolverResult<ComponentId> {
        self.prepare_active()?;
        let query = match ComponentQuery::parse(identifier) {
            Ok(query) => query,
            Err(_) => return Err(self.unknown_component(identifier)),
        };
        let context = &mut self.contexts[self.active];
        let base = base_ids(&context.packs);
        match context.pool.as_mut() {
            Some(pool) => pool.select(&query, count, &base, &mut context.pack_refs),
            None => Err(ResolverError::operation("context is not prepared")),
        }
    }

    /// Deselect the component named by `identifier` in the active context
    pub fn deselect_component(&mut self, identifier: &str) -> ResolverResult<ComponentId> {
        self.select_component(identifier, 0)
    }

    /// Pin the bundle used for a component class in the active context
    pub fn select_bundle(&mut self, class: &str, bundle: &str) -> ResolverResult<()> {
        self.active_pool()?.select_bundle(class, bundle)
    }

    /// Pin the variant used for a component class in the active context
    pub fn select_variant(&mut self, class: &str, variant: &str) -> ResolverResult<()> {
        self.active_pool()?.select_variant(class, variant)
    }

    /// Add the packs matching `requirement` to the active context and
    /// make their components available for selection.
    ///
    /// Added packs join the context's declared set, as if the
    /// requirement had been written in the solution, and stay across
    /// `apply`. Returns the number of packs newly added.
    pub fn select_pack(&mut self, requirement: &str) -> ResolverResult<usize> {
        self.prepare_active()?;
        let requirement = PackRequirement::parse(requirement)?;
        let matched = self.index.match_requirement(&requirement);
        if matched.is_empty() {
            let message = if requirement.is_filter() {
                format!("no match found for pack filter: {requirement}")
            } else {
                format!("required pack not installed: {requirement}")
            };
            return Err(ResolverError::operation(message));
        }
        let chosen = PackIndex::latest_per_key(matched);
        let selected_by = requirement.to_string();
        let context = &mut self.contexts[self.active];
        let mut added = 0;
        for pack in chosen {
            match context.packs.iter_mut().find(|entry| entry.id == pack.id) {
                Some(entry) => {
                    if !entry.selected_by.contains(&selected_by) {
                        entry.selected_by.push(selected_by.clone());
                    }
                }
                None => {
                    context.packs.push(ResolvedPackRef {
                        id: pack.id.clone(),
                        selected_by: vec![selected_by.clone()],
                    });
                    added += 1;
                }
            }
        }
        if added > 0 {
            rebuild_pool(context, &self.index);
        }
        Ok(added)
    }

    /// Drop pack references marked removable from the active context,
    /// returning how many were purged. Selections are unaffected.
    pub fn apply(&mut self) -> ResolverResult<usize> {
        self.prepare_active()?;
        let context = &mut self.contexts[self.active];
        let before = context.pack_refs.len();
        context.pack_refs.retain(|_, state| !state.removable);
        Ok(before - context.pack_refs.len())
    }

    /// Validate component dependencies for every context, or only for
    /// the context named by `selection`
    pub fn validate(&mut self, selection: Option<&str>) -> ResolverResult<Vec<ContextVerdict>> {
        self.run(selection, false)
    }

    /// Validate and additionally select missing dependencies wherever
    /// exactly one selectable candidate satisfies them
    pub fn resolve(&mut self, selection: Option<&str>) -> ResolverResult<Vec<ContextVerdict>> {
        self.run(selection, true)
    }

    fn run(
        &mut self,
        selection: Option<&str>,
        auto_select: bool,
    ) -> ResolverResult<Vec<ContextVerdict>> {
        let solution = match &self.solution {
            Some(solution) => solution,
            None => return Err(ResolverError::operation("no solution is loaded")),
        };
        if let Some(name) = selection {
            if !self.contexts.iter().any(|c| c.name == name) {
                return Err(ResolverError::operation(format!(
                    "context '{name}' was not found"
                )));
            }
        }
        let mut verdicts = Vec::new();
        for context in &mut self.contexts {
            if selection.is_some_and(|name| context.name != name) {
                continue;
            }
            prepare_context(
                context,
                solution,
                &self.index,
                self.lock.as_ref(),
                &self.notes,
                &self.layers,
            );
            let report = run_validation(context, &self.index, auto_select);
            verdicts.push(ContextVerdict {
                name: context.name.clone(),
                failed: context.failed,
                report,
            });
        }
        Ok(verdicts)
    }

    /// Installed pack ids, narrowed to the solution's requirement set
    /// when the loaded solution declares pack requirements
    pub fn list_packs(&self, filter: &str) -> ResolverResult<Vec<String>> {
        let mut lines = Vec::new();
        match &self.solution {
            Some(solution) if !solution.packs.is_empty() => {
                let mut scratch = Diagnostics::new();
                let resolved = resolve_packs(
                    &solution.packs,
                    &self.index,
                    PackPolicy::All,
                    self.lock.as_ref(),
                    &mut scratch,
                );
                if let Some(error) = scratch.messages(Severity::Error).first() {
                    return Err(ResolverError::operation(*error));
                }
                for entry in resolved {
                    push_unique(&mut lines, entry.id.to_string());
                }
            }
            _ => {
                for pack in self.index.iter() {
                    push_unique(&mut lines, pack.id.to_string());
                }
            }
        }
        finish_listing(lines, filter, "pack")
    }

    /// Installed devices, one line per named processor
    pub fn list_devices(&self, filter: &str) -> ResolverResult<Vec<String>> {
        let mut lines = Vec::new();
        for (_, device) in self.index.devices() {
            let processors = device.processor_names();
            if processors.is_empty() {
                push_unique(&mut lines, device.full_name());
            } else {
                for pname in processors {
                    push_unique(&mut lines, format!("{}:{}", device.full_name(), pname));
                }
            }
        }
        finish_listing(lines, filter, "device")
    }

    pub fn list_boards(&self, filter: &str) -> ResolverResult<Vec<String>> {
        let mut lines = Vec::new();
        for (_, board) in self.index.boards() {
            push_unique(&mut lines, board.full_id());
        }
        finish_listing(lines, filter, "board")
    }

    pub fn list_components(&self, filter: &str) -> ResolverResult<Vec<String>> {
        let mut lines = Vec::new();
        for (_, component) in self.index.components() {
            push_unique(&mut lines, component.id.to_string());
        }
        finish_listing(lines, filter, "component")
    }

    /// Discovered layer files with their type tags
    pub fn list_layers(&self, filter: &str) -> ResolverResult<Vec<String>> {
        let mut lines = Vec::new();
        for layer in &self.layers {
            push_unique(
                &mut lines,
                format!("{} (type: {})", layer.path, layer.layer_type),
            );
        }
        finish_listing(lines, filter, "layer")
    }

    /// Build context names derived from the loaded solution
    pub fn list_contexts(&self, filter: &str) -> ResolverResult<Vec<String>> {
        if self.solution.is_none() {
            return Err(ResolverError::operation("no solution is loaded"));
        }
        let lines = self.contexts.iter().map(|c| c.name.clone()).collect();
        finish_listing(lines, filter, "context")
    }

    /// Ensure the active context is prepared, surfacing its last
    /// pipeline error as the operation error
    fn prepare_active(&mut self) -> ResolverResult<()> {
        let solution = match &self.solution {
            Some(solution) => solution,
            None => return Err(ResolverError::operation("no solution is loaded")),
        };
        let context = match self.contexts.get_mut(self.active) {
            Some(context) => context,
            None => {
                return Err(ResolverError::operation(
                    "the solution declares no build contexts",
                ))
            }
        };
        prepare_context(
            context,
            solution,
            &self.index,
            self.lock.as_ref(),
            &self.notes,
            &self.layers,
        );
        if context.failed || context.pool.is_none() {
            let message = context
                .diagnostics
                .messages(Severity::Error)
                .last()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("context '{}' failed to resolve", context.name));
            return Err(ResolverError::operation(message));
        }
        Ok(())
    }

    fn active_pool(&mut self) -> ResolverResult<&mut ComponentPool> {
        self.prepare_active()?;
        self.contexts[self.active]
            .pool
            .as_mut()
            .ok_or_else(|| ResolverError::operation("context is not prepared"))
    }

    /// Error for an identifier naming no component, with a note when it
    /// looks like an installed board instead
    fn unknown_component(&self, identifier: &str) -> ResolverError {
        let mut message = format!("no component was found with identifier '{identifier}'");
        if let Some(board) = self.board_near_miss(identifier) {
            message.push_str(&format!(
                "\nnote: the identifier names installed board '{board}'"
            ));
        }
        ResolverError::operation(message)
    }

    fn board_near_miss(&self, text: &str) -> Option<String> {
        let wanted = text.trim();
        self.index.boards().find_map(|(_, board)| {
            let id = board.full_id();
            let name_only = id.split_once("::").map_or(id.as_str(), |(_, rest)| rest);
            let without_revision = name_only.split(':').next().unwrap_or(name_only);
            if id.eq_ignore_ascii_case(wanted)
                || name_only.eq_ignore_ascii_case(wanted)
                || without_revision.eq_ignore_ascii_case(wanted)
            {
                Some(id.clone())
            } else {
                None
            }
        })
    }
}

/// One context per project, build type and target type, in declaration
/// order with target types innermost
fn derive_contexts(solution: &SolutionFile, projects: &[ProjectFile]) -> Vec<Context> {
    let build_types = if solution.build_types.is_empty() {
        vec![String::new()]
    } else {
        solution.build_types.clone()
    };
    let mut contexts = Vec::new();
    for project in projects {
        for build_type in &build_types {
            for target_type in &solution.target_types {
                contexts.push(Context::new(project.clone(), build_type, &target_type.name));
            }
        }
    }
    contexts
}

/// Run the preparation pipeline for one context: pack resolution,
/// target resolution, pool construction, project component selection
/// and layer composition.
///
/// Idempotent; a context that is already prepared or has failed is left
/// untouched. Failures mark the context instead of returning an error,
/// so a batch run can carry on with its remaining contexts.
fn prepare_context(
    context: &mut Context,
    solution: &SolutionFile,
    index: &PackIndex,
    lock: Option<&LockFile>,
    notes: &[LoadNote],
    discovered: &[LayerFile],
) {
    if context.pool.is_some() || context.failed {
        return;
    }
    for note in notes {
        match note.severity {
            NoteSeverity::Warning => context.diagnostics.warning(note.message.clone()),
            NoteSeverity::Error => context.diagnostics.error(note.message.clone()),
        }
    }

    let before = context.diagnostics.entries().len();
    context.packs = resolve_packs(
        &solution.packs,
        index,
        PackPolicy::Latest,
        lock,
        &mut context.diagnostics,
    );
    let pack_errors = context.diagnostics.entries()[before..]
        .iter()
        .any(|entry| entry.severity == Severity::Error);
    if pack_errors {
        context.fail();
        return;
    }

    let target_type = match solution.target_type(&context.target_type) {
        Some(target_type) => target_type,
        None => {
            context.diagnostics.error(format!(
                "target-type '{}' is not declared in the solution",
                context.target_type
            ));
            context.fail();
            return;
        }
    };
    let target_level = format!("target-type '{}'", target_type.name);
    let project_level = format!("project '{}'", context.project.name);

    let selections = collect_selections(
        solution,
        target_type,
        &context.project,
        &target_level,
        &project_level,
    );
    let (device, board, compiler) = match selections {
        Ok(parts) => parts,
        Err(error) => {
            context.diagnostics.error(error.to_string());
            context.fail();
            return;
        }
    };
    let mut overrides = Vec::new();
    for (key, value) in &target_type.attributes {
        overrides.push(AttrOverride::new(key, value, &target_level));
    }
    for (key, value) in &context.project.attributes {
        overrides.push(AttrOverride::new(key, value, &project_level));
    }

    let input = TargetInput {
        device,
        board,
        compiler,
        overrides,
    };
    let packs = pack_slice(index, &context.packs);
    let target = match resolve_target(&input, &packs, &mut context.diagnostics) {
        Ok(target) => target,
        Err(error) => {
            context.diagnostics.error(error.to_string());
            context.fail();
            return;
        }
    };

    let mut pool = ComponentPool::build(&packs, &target.attributes, &mut context.diagnostics);
    let base = base_ids(&context.packs);
    for selection in &context.project.components {
        if let Err(error) = pool.select(
            &selection.query,
            selection.count,
            &base,
            &mut context.pack_refs,
        ) {
            context.diagnostics.error(error.to_string());
        }
    }

    let project_dir = context
        .project
        .path
        .parent()
        .map(Utf8Path::to_path_buf)
        .unwrap_or_default();
    let mut items: Vec<ConnectItem> = context
        .project
        .connects
        .iter()
        .map(|decl| ConnectItem::from_decl(context.project.name.as_str(), decl))
        .collect();
    let mut slots = Vec::new();
    for layer_ref in &context.project.layers {
        match &layer_ref.path {
            // An explicit path bypasses discovery and the solver.
            Some(path) => match load_layer(&project_dir.join(path)) {
                Ok(layer) => {
                    for selection in &layer.components {
                        if let Err(error) = pool.select(
                            &selection.query,
                            selection.count,
                            &base,
                            &mut context.pack_refs,
                        ) {
                            context.diagnostics.error(error.to_string());
                        }
                    }
                    let filename = layer.path.to_string();
                    for decl in &layer.connects {
                        items.push(ConnectItem::from_decl(filename.as_str(), decl));
                    }
                    context
                        .layers
                        .insert(layer_ref.layer_type.clone(), filename);
                }
                Err(error) => {
                    context.diagnostics.error(error.to_string());
                }
            },
            None => {
                let candidates: Vec<LayerCandidate> = discovered
                    .iter()
                    .filter(|layer| layer.layer_type == layer_ref.layer_type)
                    .filter(|layer| layer.applies_to(target.board.as_ref(), Some(&target.device)))
                    .map(|layer| LayerCandidate {
                        filename: layer.path.to_string(),
                        connects: layer
                            .connects
                            .iter()
                            .map(|decl| ConnectItem::from_decl(layer.path.as_str(), decl))
                            .collect(),
                    })
                    .collect();
                slots.push(LayerSlot {
                    layer_type: layer_ref.layer_type.clone(),
                    optional: layer_ref.optional,
                    candidates,
                });
            }
        }
    }

    if !slots.is_empty() || !items.is_empty() {
        match solve_connections(&items, &slots, &mut context.diagnostics) {
            Ok(outcome) => {
                // Layers settle only on an unambiguous outcome; with
                // several viable combinations the per-type diagnostics
                // already name the alternatives.
                if let [configuration] = outcome.configurations.as_slice() {
                    for (layer_type, filename) in &configuration.layers {
                        context.layers.insert(layer_type.clone(), filename.clone());
                        let chosen = discovered.iter().find(|l| l.path.as_str() == filename);
                        if let Some(layer) = chosen {
                            for selection in &layer.components {
                                if let Err(error) = pool.select(
                                    &selection.query,
                                    selection.count,
                                    &base,
                                    &mut context.pack_refs,
                                ) {
                                    context.diagnostics.error(error.to_string());
                                }
                            }
                        }
                    }
                }
            }
            Err(error) => {
                context.diagnostics.error(error.to_string());
                context.fail();
            }
        }
    }

    context.target = Some(target);
    context.pool = Some(pool);
}

/// Dependency validation for a prepared context; `None` when the
/// context failed beforehand or validation itself errors out
fn run_validation(
    context: &mut Context,
    index: &PackIndex,
    auto_select: bool,
) -> Option<ValidationReport> {
    if context.failed {
        return None;
    }
    let packs = pack_slice(index, &context.packs);
    let base = base_ids(&context.packs);
    let target = match &context.target {
        Some(target) => target,
        None => return None,
    };
    let pool = match context.pool.as_mut() {
        Some(pool) => pool,
        None => return None,
    };
    let result = if auto_select {
        dependencies::resolve(
            pool,
            &packs,
            &target.attributes,
            &base,
            &mut context.pack_refs,
        )
    } else {
        dependencies::validate(pool, &packs, &target.attributes)
    };
    match result {
        Ok(report) => Some(report),
        Err(error) => {
            context.diagnostics.error(error.to_string());
            context.fail();
            None
        }
    }
}

/// Rebuild the context's pool from its current pack set, replaying
/// bundle and variant pins first and then every selection into the
/// enlarged candidate set. Reference counts are rebuilt along the way;
/// references already pending removal stay pending.
fn rebuild_pool(context: &mut Context, index: &PackIndex) {
    let target = match &context.target {
        Some(target) => target,
        None => return,
    };
    let previous = match context.pool.take() {
        Some(pool) => pool,
        None => return,
    };
    let packs = pack_slice(index, &context.packs);
    let mut pool = ComponentPool::build(&packs, &target.attributes, &mut context.diagnostics);
    let base = base_ids(&context.packs);
    let pending: Vec<String> = context
        .pack_refs
        .iter()
        .filter(|(_, state)| state.users == 0)
        .map(|(id, _)| id.clone())
        .collect();
    context.pack_refs.clear();

    for (class, bundle) in previous.pinned_bundles() {
        if let Err(error) = pool.select_bundle(class, bundle) {
            context.diagnostics.error(error.to_string());
        }
    }
    for (class, variant) in previous.pinned_variants() {
        if let Err(error) = pool.select_variant(class, variant) {
            context.diagnostics.error(error.to_string());
        }
    }
    for used in previous.used() {
        let parsed = ComponentQuery::parse(&used.selected_by)
            .or_else(|_| ComponentQuery::parse(&used.id.to_string()));
        match parsed {
            Ok(query) => {
                if let Err(error) = pool.select(&query, used.count, &base, &mut context.pack_refs) {
                    context.diagnostics.error(error.to_string());
                }
            }
            Err(error) => context.diagnostics.error(error.to_string()),
        }
    }
    for id in pending {
        context.pack_refs.insert(
            id,
            PackRefState {
                users: 0,
                removable: true,
            },
        );
    }
    context.pool = Some(pool);
}

/// Device, board and compiler selections merged across the solution,
/// target-type and project levels
fn collect_selections(
    solution: &SolutionFile,
    target_type: &TargetType,
    project: &ProjectFile,
    target_level: &str,
    project_level: &str,
) -> Result<(DeviceSpec, BoardSpec, Option<ToolchainItem>), ConfigError> {
    let device = collect_device(&selection_levels(
        solution.device.as_deref(),
        target_type.device.as_deref(),
        project.device.as_deref(),
        target_level,
        project_level,
    ))?;
    let board = collect_board(&selection_levels(
        solution.board.as_deref(),
        target_type.board.as_deref(),
        project.board.as_deref(),
        target_level,
        project_level,
    ))?;
    let compiler = collect_compiler(&selection_levels(
        solution.compiler.as_deref(),
        target_type.compiler.as_deref(),
        project.compiler.as_deref(),
        target_level,
        project_level,
    ))?;
    Ok((device, board, compiler))
}

fn selection_levels<'a>(
    solution_value: Option<&'a str>,
    target_value: Option<&'a str>,
    project_value: Option<&'a str>,
    target_level: &'a str,
    project_level: &'a str,
) -> [Leveled<'a>; 3] {
    [
        Leveled::new(solution_value.unwrap_or(""), "solution"),
        Leveled::new(target_value.unwrap_or(""), target_level),
        Leveled::new(project_value.unwrap_or(""), project_level),
    ]
}

/// Installed packs for the context's resolved pack set, resolution order
fn pack_slice<'a>(index: &'a PackIndex, entries: &[ResolvedPackRef]) -> Vec<&'a Pack> {
    entries
        .iter()
        .filter_map(|entry| index.find(&entry.id))
        .collect()
}

/// Ids of the packs pinned by a declared requirement
fn base_ids(entries: &[ResolvedPackRef]) -> Vec<PackId> {
    entries
        .iter()
        .filter(|entry| !entry.selected_by.is_empty())
        .map(|entry| entry.id.clone())
        .collect()
}

fn push_unique(lines: &mut Vec<String>, line: String) {
    if !lines.contains(&line) {
        lines.push(line);
    }
}

/// Apply the word filter and reject an empty outcome
fn finish_listing(lines: Vec<String>, filter: &str, kind: &str) -> ResolverResult<Vec<String>> {
    if filter.is_empty() {
        return Ok(lines);
    }
    let filtered = apply_filter(&lines, filter);
    if filtered.is_empty() {
        return Err(ResolverError::operation(format!(
            "no {kind} was found with filter '{filter}'"
        )));
    }
    Ok(filtered)
}

#[cfg(test)]
mod tests;
