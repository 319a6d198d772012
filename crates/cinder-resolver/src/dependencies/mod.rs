//! Dependency validation of the selected component set
//!
//! Every selected component's condition is evaluated in dependency
//! context against the candidate pool, producing the severity verdict
//! and the literal unmet rules reporters print. [`resolve`] drives the
//! iteration that turns `SELECTABLE` verdicts into selections.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use cinder_core::{Attributes, ComponentId, ComponentQuery, PackId};
use cinder_registry::Pack;

use crate::components::ComponentPool;
use crate::conditions::{ConditionEvaluator, Evaluation, ValidationResult};
use crate::context::PackRefState;
use crate::ResolverResult;

pub use crate::conditions::UnmetRule;

/// Verdict for one selected component, with the unmet rules in
/// evaluation order
#[derive(Debug, Clone, Serialize)]
pub struct ComponentValidation {
    pub id: ComponentId,
    pub result: ValidationResult,
    pub unmet: Vec<UnmetRule>,
}

/// Verdict over every selected component of a context
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub components: Vec<ComponentValidation>,
    pub overall: ValidationResult,
}

impl ValidationReport {
    /// True when nothing actionable remains
    pub fn is_clean(&self) -> bool {
        matches!(
            self.overall,
            ValidationResult::Fulfilled | ValidationResult::Ignored
        )
    }

    /// Components that still need attention, report order
    pub fn unmet_components(&self) -> impl Iterator<Item = &ComponentValidation> {
        self.components.iter().filter(|c| {
            !matches!(
                c.result,
                ValidationResult::Fulfilled | ValidationResult::Ignored
            )
        })
    }
}

/// Validate every selected component against the pool.
///
/// Each component's condition is evaluated in dependency context with
/// the pool answering component expressions; an exclusive API with more
/// than one selected implementation adds a `CONFLICT` rule on each
/// implementer. The overall verdict is the worst non-ignored component
/// verdict and does not depend on selection order.
pub fn validate(
    pool: &ComponentPool,
    packs: &[&Pack],
    target: &Attributes,
) -> ResolverResult<ValidationReport> {
    let mut components = Vec::new();

    for (candidate, _) in pool.selected() {
        let owner = packs.iter().find(|p| p.id == candidate.pack_id);
        let mut evaluation = match (&candidate.component.condition, owner) {
            (Some(condition), Some(pack)) => {
                ConditionEvaluator::new(&pack.conditions, target).evaluate(condition, pool)?
            }
            _ => Evaluation::default(),
        };

        let api_key = candidate.component.api_key();
        let conflicts = pool.exclusive_conflicts(&api_key);
        if !conflicts.is_empty() {
            let expression = pool
                .api(&api_key)
                .map(ToString::to_string)
                .unwrap_or(api_key);
            evaluation.result = evaluation.result.worst(ValidationResult::Conflict);
            evaluation.unmet.push(UnmetRule {
                expression,
                result: ValidationResult::Conflict,
                aggregates: conflicts,
            });
        }

        components.push(ComponentValidation {
            id: candidate.component.id.clone(),
            result: evaluation.result,
            unmet: evaluation.unmet,
        });
    }

    let overall = components
        .iter()
        .fold(ValidationResult::Fulfilled, |acc, c| acc.worst(c.result));
    Ok(ValidationReport { components, overall })
}

/// Resolve `SELECTABLE` verdicts by selecting their aggregates.
///
/// Each sweep selects every aggregate that is the single satisfier of an
/// unmet rule, then re-validates; selection can surface new unmet rules,
/// so sweeps repeat until the report is clean or a sweep makes no
/// progress. Fulfilled input passes through untouched.
pub fn resolve(
    pool: &mut ComponentPool,
    packs: &[&Pack],
    target: &Attributes,
    base: &[PackId],
    refs: &mut IndexMap<String, PackRefState>,
) -> ResolverResult<ValidationReport> {
    let mut report = validate(pool, packs, target)?;
    loop {
        if report.is_clean() {
            return Ok(report);
        }
        let picks = selectable_aggregates(&report);
        if picks.is_empty() {
            return Ok(report);
        }

        let mut progressed = false;
        for aggregate in picks {
            let query = ComponentQuery::parse(&aggregate)?;
            match pool.select(&query, 1, base, refs) {
                Ok(id) => {
                    progressed = true;
                    debug!("dependency resolution selected '{id}'");
                }
                Err(error) => {
                    // ambiguous or vanished aggregate; left for the user
                    debug!("aggregate '{aggregate}' was not selected: {error}");
                }
            }
        }
        if !progressed {
            return Ok(report);
        }
        report = validate(pool, packs, target)?;
    }
}

/// Aggregates that uniquely satisfy an unmet rule of a `SELECTABLE`
/// component, deduplicated in report order
fn selectable_aggregates(report: &ValidationReport) -> Vec<String> {
    let mut picks: Vec<String> = Vec::new();
    for component in &report.components {
        if component.result != ValidationResult::Selectable {
            continue;
        }
        for rule in &component.unmet {
            if rule.result == ValidationResult::Selectable && rule.aggregates.len() == 1 {
                let aggregate = &rule.aggregates[0];
                if !picks.iter().any(|p| p == aggregate) {
                    picks.push(aggregate.clone());
                }
            }
        }
    }
    picks
}
