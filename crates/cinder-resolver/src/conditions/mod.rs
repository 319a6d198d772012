//! Condition evaluation
//!
//! Conditions gate components two ways. In **filter context** a condition
//! decides whether a component applies to the resolved target at all,
//! evaluating only target (`D*`/`T*`) expressions. In **dependency
//! context** it classifies the component's requirements against the
//! current selection, evaluating only component (`C*`) expressions and
//! producing a [`ValidationResult`] plus the unmet rule expressions.
//!
//! Combination is worst-of across `require` and `deny` rules and best-of
//! across `accept` rules; a condition's result is the worse of the two.
//! `deny` inverts its operand. `IGNORED` operands drop out entirely and
//! an empty condition is `IGNORED`.

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::Serialize;

use cinder_core::{utils::wildcard_match, Attributes};
use cinder_registry::{Condition, ConditionRule, RuleKind};

use crate::{ResolverError, ResolverResult};

/// Dependency classification of a component or expression.
///
/// Variants are ordered least to most severe; `Ignored` sits outside the
/// severity scale and is skipped by the combinators. The serialized
/// spellings are a stable contract consumed by downstream tooling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationResult {
    Fulfilled,
    Selectable,
    Missing,
    Conflict,
    Incompatible,
    IncompatibleVariant,
    #[default]
    Ignored,
}

impl ValidationResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fulfilled => "FULFILLED",
            Self::Selectable => "SELECTABLE",
            Self::Missing => "MISSING",
            Self::Conflict => "CONFLICT",
            Self::Incompatible => "INCOMPATIBLE",
            Self::IncompatibleVariant => "INCOMPATIBLE_VARIANT",
            Self::Ignored => "IGNORED",
        }
    }

    /// Worst of two results, skipping `Ignored`
    pub fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Ignored, other) => other,
            (this, Self::Ignored) => this,
            (this, other) => this.max(other),
        }
    }

    /// Best of two results, skipping `Ignored`
    pub fn best(self, other: Self) -> Self {
        match (self, other) {
            (Self::Ignored, other) => other,
            (this, Self::Ignored) => this,
            (this, other) => this.min(other),
        }
    }

    /// Inversion applied by `deny` rules: a met operand becomes
    /// `Incompatible`, an unmet one is satisfied
    pub fn invert(self) -> Self {
        match self {
            Self::Ignored => Self::Ignored,
            Self::Fulfilled => Self::Incompatible,
            _ => Self::Fulfilled,
        }
    }

    fn is_settled(self) -> bool {
        self == Self::Fulfilled || self == Self::Ignored
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unmet rule of a failed condition, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmetRule {
    /// Literal rule expression, e.g. `require RteTest:CORE`
    pub expression: String,

    /// Classification this rule contributed
    pub result: ValidationResult,

    /// Aggregate ids the expression matched, in candidate order
    pub aggregates: Vec<String>,
}

/// Result of evaluating one condition in dependency context
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub result: ValidationResult,
    pub unmet: Vec<UnmetRule>,
}

/// Classification of one component expression against the candidate pool
#[derive(Debug, Clone)]
pub struct ExpressionOutcome {
    pub result: ValidationResult,
    pub aggregates: Vec<String>,
}

/// Supplies component-expression classification during dependency
/// evaluation; implemented by the component pool
pub trait AggregateOracle {
    fn classify(&self, attrs: &Attributes) -> ExpressionOutcome;
}

/// Detect reference cycles among a pack's conditions.
///
/// Returns the id of a condition participating in a cycle, if any.
pub fn detect_condition_cycle(conditions: &IndexMap<String, Condition>) -> Option<String> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes = HashMap::new();
    for id in conditions.keys() {
        nodes.insert(id.as_str(), graph.add_node(id.as_str()));
    }
    for condition in conditions.values() {
        let from = nodes[condition.id.as_str()];
        for reference in condition.references() {
            // unresolved references surface during evaluation instead
            if let Some(&to) = nodes.get(reference) {
                graph.add_edge(from, to, ());
            }
        }
    }
    match toposort(&graph, None) {
        Ok(_) => None,
        Err(cycle) => Some(graph[cycle.node_id()].to_string()),
    }
}

struct RuleEval {
    result: ValidationResult,
    unmet: Vec<UnmetRule>,
    aggregates: Vec<String>,
}

/// Evaluates the conditions of one pack against a resolved target.
///
/// Filter verdicts are memoized per condition; a dynamic guard backs up
/// the static cycle check in [`detect_condition_cycle`].
pub struct ConditionEvaluator<'a> {
    conditions: &'a IndexMap<String, Condition>,
    target: &'a Attributes,
    filter_memo: HashMap<String, bool>,
    stack: Vec<String>,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(conditions: &'a IndexMap<String, Condition>, target: &'a Attributes) -> Self {
        Self {
            conditions,
            target,
            filter_memo: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn lookup(&self, id: &str) -> ResolverResult<&'a Condition> {
        self.conditions
            .get(id)
            .ok_or_else(|| ResolverError::operation(format!("condition '{id}' was not found")))
    }

    fn enter(&mut self, id: &str) -> ResolverResult<()> {
        if self.stack.iter().any(|seen| seen == id) {
            return Err(ResolverError::operation(format!(
                "direct or indirect recursion detected in condition '{id}'"
            )));
        }
        self.stack.push(id.to_string());
        Ok(())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }

    /// Filter context: does the target satisfy this condition?
    pub fn filter(&mut self, id: &str) -> ResolverResult<bool> {
        if let Some(&memoized) = self.filter_memo.get(id) {
            return Ok(memoized);
        }
        self.enter(id)?;
        let outcome = self.filter_uncached(id);
        self.leave();
        let passed = outcome?;
        self.filter_memo.insert(id.to_string(), passed);
        Ok(passed)
    }

    fn filter_uncached(&mut self, id: &str) -> ResolverResult<bool> {
        let condition = self.lookup(id)?;
        let mut pass = true;
        let mut any_accept = false;
        let mut accept_pass = false;
        for rule in &condition.rules {
            let met = match self.filter_rule(rule)? {
                Some(met) => met,
                None => continue,
            };
            match rule.kind {
                RuleKind::Require => {
                    if !met {
                        pass = false;
                    }
                }
                RuleKind::Deny => {
                    if met {
                        pass = false;
                    }
                }
                RuleKind::Accept => {
                    any_accept = true;
                    if met {
                        accept_pass = true;
                    }
                }
            }
        }
        Ok(pass && (!any_accept || accept_pass))
    }

    /// `None` means the rule does not constrain the filter
    fn filter_rule(&mut self, rule: &ConditionRule) -> ResolverResult<Option<bool>> {
        if let Some(reference) = &rule.condition {
            return self.filter(reference).map(Some);
        }
        if rule.is_component_expression() || rule.attrs.is_empty() {
            return Ok(None);
        }
        Ok(Some(target_expression_matches(&rule.attrs, self.target)))
    }

    /// Dependency context: classify this condition against the selection
    pub fn evaluate(
        &mut self,
        id: &str,
        oracle: &dyn AggregateOracle,
    ) -> ResolverResult<Evaluation> {
        self.enter(id)?;
        let outcome = self.evaluate_uncached(id, oracle);
        self.leave();
        outcome
    }

    fn evaluate_uncached(
        &mut self,
        id: &str,
        oracle: &dyn AggregateOracle,
    ) -> ResolverResult<Evaluation> {
        let condition = self.lookup(id)?;

        let mut required = ValidationResult::Ignored;
        let mut required_unmet: Vec<UnmetRule> = Vec::new();
        let mut accepted = ValidationResult::Ignored;
        let mut accept_unmet: Vec<UnmetRule> = Vec::new();

        for rule in &condition.rules {
            let eval = self.evaluate_rule(rule, oracle)?;
            match rule.kind {
                RuleKind::Require => {
                    required = required.worst(eval.result);
                    required_unmet.extend(eval.unmet);
                }
                RuleKind::Deny => {
                    let inverted = eval.result.invert();
                    required = required.worst(inverted);
                    if !inverted.is_settled() {
                        required_unmet.push(UnmetRule {
                            expression: rule.expression(),
                            result: inverted,
                            aggregates: eval.aggregates,
                        });
                    }
                }
                RuleKind::Accept => {
                    accepted = accepted.best(eval.result);
                    accept_unmet.extend(eval.unmet);
                }
            }
        }

        let result = accepted.worst(required);
        let mut unmet = Vec::new();
        if !result.is_settled() {
            if !accepted.is_settled() {
                unmet.extend(accept_unmet);
            }
            unmet.extend(required_unmet);
        }
        Ok(Evaluation { result, unmet })
    }

    fn evaluate_rule(
        &mut self,
        rule: &ConditionRule,
        oracle: &dyn AggregateOracle,
    ) -> ResolverResult<RuleEval> {
        if let Some(reference) = &rule.condition {
            let inner = self.evaluate(reference, oracle)?;
            let aggregates = inner
                .unmet
                .iter()
                .flat_map(|u| u.aggregates.iter().cloned())
                .collect();
            return Ok(RuleEval {
                result: inner.result,
                unmet: inner.unmet,
                aggregates,
            });
        }
        if !rule.is_component_expression() {
            // target expressions already shaped the filter
            return Ok(RuleEval {
                result: ValidationResult::Ignored,
                unmet: Vec::new(),
                aggregates: Vec::new(),
            });
        }
        let outcome = oracle.classify(&rule.attrs);
        let unmet = if outcome.result.is_settled() {
            Vec::new()
        } else {
            vec![UnmetRule {
                expression: rule.expression(),
                result: outcome.result,
                aggregates: outcome.aggregates.clone(),
            }]
        };
        Ok(RuleEval {
            result: outcome.result,
            unmet,
            aggregates: outcome.aggregates,
        })
    }
}

/// Every pattern in `attrs` must match the target value for its key
fn target_expression_matches(attrs: &Attributes, target: &Attributes) -> bool {
    attrs.iter().all(|(key, pattern)| match target.get(key) {
        Some(value) => wildcard_match(pattern, value),
        None => false,
    })
}
