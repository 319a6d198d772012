//! Pack requirement resolution
//!
//! Binds a solution's pack requirements to installed packs. When a lock
//! file exists it is consulted first, so repeated resolution with
//! unchanged inputs reproduces the previous binding even after newer
//! pack versions are installed.

use cinder_config::LockFile;
use cinder_core::{PackId, PackRequirement};
use cinder_registry::PackIndex;
use indexmap::IndexMap;
use tracing::debug;

use crate::context::Diagnostics;

/// How installed packs are admitted into a context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PackPolicy {
    /// Every pack must be declared; an empty declaration set is an error
    Required,
    /// Highest installed version matching each requirement
    #[default]
    Latest,
    /// Every matching version; used for listings, never for building
    All,
}

/// An installed pack together with the requirements that selected it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackRef {
    pub id: PackId,

    /// Requirement strings in declaration order
    pub selected_by: Vec<String>,
}

/// Resolve the declared requirements against the installed packs.
///
/// Failures are recorded as diagnostics rather than returned, so every
/// requirement is reported in one run.
pub fn resolve_packs(
    requirements: &[PackRequirement],
    index: &PackIndex,
    policy: PackPolicy,
    lock: Option<&LockFile>,
    diagnostics: &mut Diagnostics,
) -> Vec<ResolvedPackRef> {
    if requirements.is_empty() {
        return resolve_undeclared(index, policy, diagnostics);
    }

    let mut resolved: IndexMap<PackId, ResolvedPackRef> = IndexMap::new();
    for requirement in requirements {
        for id in bind_requirement(requirement, index, policy, lock, diagnostics) {
            let entry = resolved.entry(id.clone()).or_insert_with(|| ResolvedPackRef {
                id,
                selected_by: Vec::new(),
            });
            let text = requirement.as_str().to_string();
            if !entry.selected_by.contains(&text) {
                entry.selected_by.push(text);
            }
        }
    }
    resolved.into_values().collect()
}

/// No requirements declared: `Latest` falls back to every installed pack
/// at its highest version, `All` to every installed pack
fn resolve_undeclared(
    index: &PackIndex,
    policy: PackPolicy,
    diagnostics: &mut Diagnostics,
) -> Vec<ResolvedPackRef> {
    let packs = match policy {
        PackPolicy::Required => {
            diagnostics.error("no pack requirements given while pack policy is 'required'");
            return Vec::new();
        }
        PackPolicy::Latest => index.latest(),
        PackPolicy::All => index.iter().collect(),
    };
    packs
        .into_iter()
        .map(|pack| ResolvedPackRef {
            id: pack.id.clone(),
            selected_by: Vec::new(),
        })
        .collect()
}

fn bind_requirement(
    requirement: &PackRequirement,
    index: &PackIndex,
    policy: PackPolicy,
    lock: Option<&LockFile>,
    diagnostics: &mut Diagnostics,
) -> Vec<PackId> {
    if let Some(lock) = lock {
        let locked = rebind_from_lock(requirement, lock, index);
        if !locked.is_empty() {
            return locked;
        }
    }

    let matched = index.match_requirement(requirement);
    if matched.is_empty() {
        if requirement.is_filter() {
            diagnostics.error(format!(
                "no match found for pack filter: {}",
                requirement.as_str()
            ));
        } else {
            diagnostics.error(format!(
                "required pack not installed: {}",
                requirement.as_str()
            ));
            diagnostics.info(format!(
                "install pack '{}', then run 'cinder resolve' again",
                requirement.as_str()
            ));
        }
        return Vec::new();
    }

    let selected = match policy {
        PackPolicy::All => matched,
        PackPolicy::Required | PackPolicy::Latest => PackIndex::latest_per_key(matched),
    };
    selected.into_iter().map(|pack| pack.id.clone()).collect()
}

/// Re-bind a requirement through the lock.
///
/// A lock entry wins when the requirement string appears in its
/// selected-by history (case-insensitive) or the requirement still
/// matches the pinned id, provided the pinned pack remains installed.
fn rebind_from_lock(requirement: &PackRequirement, lock: &LockFile, index: &PackIndex) -> Vec<PackId> {
    let text = requirement.as_str();
    let mut bound = Vec::new();
    for entry in &lock.packs {
        let in_history = entry
            .selected_by
            .iter()
            .any(|s| s.eq_ignore_ascii_case(text));
        if !in_history && !requirement.matches(&entry.id) {
            continue;
        }
        if index.find(&entry.id).is_none() {
            debug!("locked pack no longer installed: {}", entry.id);
            continue;
        }
        debug!("requirement '{}' re-bound from lock: {}", text, entry.id);
        bound.push(entry.id.clone());
    }
    bound
}
