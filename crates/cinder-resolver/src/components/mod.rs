//! Component candidate pool and selection
//!
//! The pool holds every installed component visible to one context,
//! tagged with the verdict of its condition evaluated in filter context
//! against the resolved target. Selection resolves project queries
//! against the filtered candidates (exact id first, then constraint
//! narrowing, then highest version), pins bundles and variants per
//! class, and maintains the pack references that interactive selection
//! creates. The pool also answers component-expression classification
//! during dependency evaluation.

use indexmap::IndexMap;
use tracing::debug;

use cinder_core::utils::wildcard_match;
use cinder_core::{Attributes, ComponentId, ComponentQuery, PackId};
use cinder_registry::{Api, Component, Pack};

use crate::conditions::{
    detect_condition_cycle, AggregateOracle, ConditionEvaluator, ExpressionOutcome,
    ValidationResult,
};
use crate::context::{Diagnostics, PackRefState};
use crate::{ResolverError, ResolverResult};

/// One installed component, tagged with provenance and filter verdict
#[derive(Debug, Clone)]
pub struct Candidate {
    pub component: Component,
    pub pack_id: PackId,

    /// Passed the filter-context check against the target
    pub filtered: bool,
}

impl Candidate {
    pub fn id(&self) -> &ComponentId {
        &self.component.id
    }
}

/// One selected component as reported by the used-items view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedComponent {
    pub id: ComponentId,
    pub pack_id: PackId,
    pub count: u32,

    /// Query text that selected the component
    pub selected_by: String,
}

#[derive(Debug, Clone)]
struct SelectionState {
    count: u32,
    selected_by: String,
}

/// Candidate pool of one context with its selection state
#[derive(Debug, Clone, Default)]
pub struct ComponentPool {
    candidates: Vec<Candidate>,

    /// API definitions by `Class:Group` key; highest version kept
    apis: IndexMap<String, Api>,

    /// Board identities, for near-miss notes on failed lookups
    board_ids: Vec<String>,

    /// Candidate index to selection state, in first-selection order
    selections: IndexMap<usize, SelectionState>,

    /// Class to pinned bundle name
    bundles: IndexMap<String, String>,

    /// Class to pinned variant name
    variants: IndexMap<String, String>,
}

impl ComponentPool {
    /// Build the candidate pool for one resolved target.
    ///
    /// A condition that cannot be evaluated (unknown reference, direct or
    /// indirect recursion) is reported once per pack; components gated by
    /// it are left out of the pool entirely.
    pub fn build(packs: &[&Pack], target: &Attributes, diagnostics: &mut Diagnostics) -> Self {
        let mut pool = Self::default();

        for pack in packs {
            if let Some(cyclic) = detect_condition_cycle(&pack.conditions) {
                diagnostics.error(format!(
                    "direct or indirect recursion detected in condition '{cyclic}'"
                ));
            }
            let mut evaluator = ConditionEvaluator::new(&pack.conditions, target);
            for component in &pack.components {
                let filtered = match &component.condition {
                    None => true,
                    Some(id) => match evaluator.filter(id) {
                        Ok(passed) => passed,
                        Err(error) => {
                            debug!("component '{}' dropped: {}", component.id, error);
                            continue;
                        }
                    },
                };
                pool.candidates.push(Candidate {
                    component: component.clone(),
                    pack_id: pack.id.clone(),
                    filtered,
                });
            }
            for api in &pack.apis {
                let key = api.key();
                let newer = pool
                    .apis
                    .get(&key)
                    .map_or(true, |existing| existing.version < api.version);
                if newer {
                    pool.apis.insert(key, api.clone());
                }
            }
            for board in &pack.boards {
                pool.board_ids.push(board.full_id());
            }
        }

        pool
    }

    /// Every candidate, pool order
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Candidates that passed target filtering
    pub fn selectable(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.filtered)
    }

    /// Selected candidates with their instance counts, selection order
    pub fn selected(&self) -> impl Iterator<Item = (&Candidate, u32)> {
        self.selections
            .iter()
            .filter(|(_, state)| state.count > 0)
            .map(|(&index, state)| (&self.candidates[index], state.count))
    }

    /// The API definition for a `Class:Group` key, if any pack declares one
    pub fn api(&self, key: &str) -> Option<&Api> {
        self.apis.get(key)
    }

    /// Resolve `query` and select the winner with `count` instances.
    ///
    /// A count of zero deselects. `base` names the packs already
    /// referenced by the context's requirements; `refs` accumulates the
    /// additional references interactive selection creates.
    pub fn select(
        &mut self,
        query: &ComponentQuery,
        count: u32,
        base: &[PackId],
        refs: &mut IndexMap<String, PackRefState>,
    ) -> ResolverResult<ComponentId> {
        if count == 0 {
            return self.deselect(query, base, refs);
        }
        let index = self.resolve_query(query)?;
        let id = self.candidates[index].component.id.clone();
        let max_instances = self.candidates[index].component.max_instances;
        let pack_id = self.candidates[index].pack_id.clone();

        if count > max_instances {
            return Err(ResolverError::operation(format!(
                "component '{id}' does not accept more than {max_instances} instance(s)"
            )));
        }

        let fresh = self.selections.get(&index).map_or(true, |s| s.count == 0);
        if fresh {
            reference_pack(&pack_id, base, refs);
        }
        self.selections.insert(
            index,
            SelectionState {
                count,
                selected_by: query.as_str().to_string(),
            },
        );
        debug!("selected component '{id}' ({count} instance(s))");
        Ok(id)
    }

    /// Deselect the component `query` resolves to. Deselecting the last
    /// component of a pack marks its reference removable; the reference
    /// itself survives until `apply` purges it.
    pub fn deselect(
        &mut self,
        query: &ComponentQuery,
        base: &[PackId],
        refs: &mut IndexMap<String, PackRefState>,
    ) -> ResolverResult<ComponentId> {
        let index = self.resolve_query(query)?;
        let id = self.candidates[index].component.id.clone();
        let pack_id = self.candidates[index].pack_id.clone();

        match self.selections.get_mut(&index) {
            Some(state) if state.count > 0 => {
                state.count = 0;
            }
            _ => {
                return Err(ResolverError::operation(format!(
                    "component '{id}' is not selected"
                )));
            }
        }
        release_pack(&pack_id, base, refs);
        debug!("deselected component '{id}'");
        Ok(id)
    }

    /// Pin the bundle used for a class; queries that leave the bundle
    /// unspecified then only match components of the pinned bundle
    pub fn select_bundle(&mut self, class: &str, bundle: &str) -> ResolverResult<()> {
        let known = self.candidates.iter().any(|c| {
            c.component.id.class == class && c.component.id.bundle.as_deref() == Some(bundle)
        });
        if !known {
            return Err(ResolverError::operation(format!(
                "no bundle '{bundle}' exists for component class '{class}'"
            )));
        }
        self.bundles.insert(class.to_string(), bundle.to_string());
        Ok(())
    }

    /// Pin the variant used for a class
    pub fn select_variant(&mut self, class: &str, variant: &str) -> ResolverResult<()> {
        let known = self.candidates.iter().any(|c| {
            c.component.id.class == class && c.component.id.variant.as_deref() == Some(variant)
        });
        if !known {
            return Err(ResolverError::operation(format!(
                "no variant '{variant}' exists for component class '{class}'"
            )));
        }
        self.variants.insert(class.to_string(), variant.to_string());
        Ok(())
    }

    /// Pinned bundle per class
    pub fn pinned_bundles(&self) -> &IndexMap<String, String> {
        &self.bundles
    }

    /// Pinned variant per class
    pub fn pinned_variants(&self) -> &IndexMap<String, String> {
        &self.variants
    }

    /// Selected components in first-selection order
    pub fn used(&self) -> Vec<UsedComponent> {
        self.selections
            .iter()
            .filter(|(_, state)| state.count > 0)
            .map(|(&index, state)| {
                let candidate = &self.candidates[index];
                UsedComponent {
                    id: candidate.component.id.clone(),
                    pack_id: candidate.pack_id.clone(),
                    count: state.count,
                    selected_by: state.selected_by.clone(),
                }
            })
            .collect()
    }

    fn is_selected(&self, index: usize) -> bool {
        self.selections.get(&index).map_or(false, |s| s.count > 0)
    }

    /// Ids of selected components implementing `key`, when the API is
    /// exclusive and more than one implementation is selected
    pub fn exclusive_conflicts(&self, key: &str) -> Vec<String> {
        match self.apis.get(key) {
            Some(api) if api.exclusive => {}
            _ => return Vec::new(),
        }
        let implementers: Vec<String> = self
            .selected()
            .filter(|(c, _)| c.component.api_key() == key)
            .map(|(c, _)| c.component.id.to_string())
            .collect();
        if implementers.len() > 1 {
            implementers
        } else {
            Vec::new()
        }
    }

    /// Apply the selection precedence: exact id text, then constraint
    /// narrowing, then highest version
    fn resolve_query(&self, query: &ComponentQuery) -> ResolverResult<usize> {
        let pin_ok = |id: &ComponentId| {
            let bundle_ok = match (&query.bundle, self.bundles.get(&id.class)) {
                (Some(_), _) | (None, None) => true,
                (None, Some(pin)) => id.bundle.as_deref() == Some(pin.as_str()),
            };
            let variant_ok = match (&query.variant, self.variants.get(&id.class)) {
                (Some(_), _) | (None, None) => true,
                (None, Some(pin)) => id.variant.as_deref() == Some(pin.as_str()),
            };
            bundle_ok && variant_ok
        };

        let active: Vec<usize> = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.filtered)
            .filter(|(_, c)| query.matches_id(&c.component.id))
            .filter(|(_, c)| pin_ok(&c.component.id))
            .map(|(index, _)| index)
            .collect();

        if active.is_empty() {
            let mut message = format!(
                "no component was found with identifier '{}'",
                query.as_str()
            );
            if let Some(board) = self.board_near_miss(query.as_str()) {
                message.push_str(&format!(
                    "\nnote: the identifier names installed board '{board}'"
                ));
            }
            return Err(ResolverError::operation(message));
        }

        // an exactly spelled-out id wins outright
        if let Some(&index) = active
            .iter()
            .find(|&&i| self.candidates[i].component.id.matches_exact_text(query.as_str()))
        {
            return Ok(index);
        }

        let mut best: Vec<usize> = Vec::new();
        for &index in &active {
            match best.first() {
                None => best.push(index),
                Some(&leader) => {
                    let version = &self.candidates[index].component.id.version;
                    match version.cmp(&self.candidates[leader].component.id.version) {
                        std::cmp::Ordering::Greater => {
                            best.clear();
                            best.push(index);
                        }
                        std::cmp::Ordering::Equal => best.push(index),
                        std::cmp::Ordering::Less => {}
                    }
                }
            }
        }
        if best.len() == 1 {
            return Ok(best[0]);
        }

        // several variants tie on version; an unspecified variant takes
        // the variant-less one as the class default
        if query.variant.is_none() {
            let default: Vec<usize> = best
                .iter()
                .copied()
                .filter(|&i| {
                    self.candidates[i]
                        .component
                        .id
                        .variant
                        .as_deref()
                        .map_or(true, str::is_empty)
                })
                .collect();
            if default.len() == 1 {
                return Ok(default[0]);
            }
        }

        let mut message = format!(
            "multiple components were found for identifier '{}'",
            query.as_str()
        );
        for &index in &best {
            message.push('\n');
            message.push_str(&self.candidates[index].component.id.to_string());
        }
        Err(ResolverError::operation(message))
    }

    /// A failed component lookup sometimes names a board instead
    fn board_near_miss(&self, text: &str) -> Option<&str> {
        let wanted = text.trim();
        self.board_ids.iter().find_map(|id| {
            let name_only = id.split_once("::").map_or(id.as_str(), |(_, rest)| rest);
            let without_revision = name_only.split(':').next().unwrap_or(name_only);
            if id.eq_ignore_ascii_case(wanted)
                || name_only.eq_ignore_ascii_case(wanted)
                || without_revision.eq_ignore_ascii_case(wanted)
            {
                Some(id.as_str())
            } else {
                None
            }
        })
    }
}

impl AggregateOracle for ComponentPool {
    fn classify(&self, attrs: &Attributes) -> ExpressionOutcome {
        let matched: Vec<usize> = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| expression_matches(attrs, &c.component.id, false))
            .map(|(index, _)| index)
            .collect();

        let mut aggregates: Vec<String> = Vec::new();
        for &index in &matched {
            let id = self.candidates[index].component.id.aggregate_id();
            if !aggregates.contains(&id) {
                aggregates.push(id);
            }
        }

        if matched.is_empty() {
            return ExpressionOutcome {
                result: ValidationResult::Missing,
                aggregates,
            };
        }

        let selected: Vec<usize> = matched
            .iter()
            .copied()
            .filter(|&index| self.is_selected(index))
            .collect();

        if !selected.is_empty() {
            for &index in &selected {
                let conflicts =
                    self.exclusive_conflicts(&self.candidates[index].component.api_key());
                if !conflicts.is_empty() {
                    return ExpressionOutcome {
                        result: ValidationResult::Conflict,
                        aggregates: conflicts,
                    };
                }
            }
            let fulfilled = selected
                .iter()
                .any(|&i| expression_matches(attrs, &self.candidates[i].component.id, true));
            let result = if fulfilled {
                ValidationResult::Fulfilled
            } else {
                ValidationResult::IncompatibleVariant
            };
            return ExpressionOutcome { result, aggregates };
        }

        if matched.iter().any(|&i| self.candidates[i].filtered) {
            ExpressionOutcome {
                result: ValidationResult::Selectable,
                aggregates,
            }
        } else {
            ExpressionOutcome {
                result: ValidationResult::Incompatible,
                aggregates,
            }
        }
    }
}

fn reference_pack(pack_id: &PackId, base: &[PackId], refs: &mut IndexMap<String, PackRefState>) {
    if base.contains(pack_id) {
        return;
    }
    let entry = refs.entry(pack_id.to_string()).or_default();
    entry.users += 1;
    entry.removable = false;
}

fn release_pack(pack_id: &PackId, base: &[PackId], refs: &mut IndexMap<String, PackRefState>) {
    if base.contains(pack_id) {
        return;
    }
    if let Some(entry) = refs.get_mut(&pack_id.to_string()) {
        entry.users = entry.users.saturating_sub(1);
        if entry.users == 0 {
            entry.removable = true;
        }
    }
}

/// Wildcard match of a component expression against an id.
///
/// Fields absent from the expression never constrain; an empty pattern
/// only matches an empty field. Variant and version participate only in
/// full matching.
fn expression_matches(attrs: &Attributes, id: &ComponentId, full: bool) -> bool {
    let field = |key: &str, actual: &str| match attrs.get(key) {
        None => true,
        Some(pattern) => wildcard_match(pattern, actual),
    };
    if !(field("Cvendor", &id.vendor)
        && field("Cclass", &id.class)
        && field("Cbundle", id.bundle.as_deref().unwrap_or(""))
        && field("Cgroup", &id.group)
        && field("Csub", id.sub.as_deref().unwrap_or("")))
    {
        return false;
    }
    if !full {
        return true;
    }
    field("Cvariant", id.variant.as_deref().unwrap_or(""))
        && field("Cversion", &id.version.to_string())
}
