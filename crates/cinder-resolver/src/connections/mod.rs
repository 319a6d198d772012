//! Combinatorial layer-connection solver
//!
//! Layers fill typed slots; each slot contributes one file, each file
//! contributes connect items, and items under a common set label are
//! mutually exclusive alternatives. The solver enumerates the Cartesian
//! product of file choices (one per type, last type varying fastest)
//! nested with the product of set alternatives within the chosen files,
//! validates every combination, and reports the maximal valid ones.

use indexmap::IndexMap;
use tracing::debug;

use cinder_config::{ConnectDecl, ConnectPair};

use crate::context::Diagnostics;
use crate::{ResolverError, ResolverResult};

/// Generation stops once this many combinations have been produced
const COMBINATION_CAP: usize = 65_536;

/// One connection declaration bound to its owning file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectItem {
    pub filename: String,

    /// Set label; items of one file sharing a non-empty label are
    /// alternatives, an empty label is always active
    pub set: String,
    pub info: String,
    pub provides: Vec<ConnectPair>,
    pub consumes: Vec<ConnectPair>,
}

impl ConnectItem {
    /// Bind a parsed connect declaration to its owning file
    pub fn from_decl(filename: impl Into<String>, decl: &ConnectDecl) -> Self {
        Self {
            filename: filename.into(),
            set: decl.set.clone(),
            info: decl.info.clone(),
            provides: decl.provides.clone(),
            consumes: decl.consumes.clone(),
        }
    }
}

/// One discovered layer file applicable to a slot
#[derive(Debug, Clone)]
pub struct LayerCandidate {
    pub filename: String,
    pub connects: Vec<ConnectItem>,
}

/// One layer slot to fill: the declared type and its candidates
#[derive(Debug, Clone)]
pub struct LayerSlot {
    pub layer_type: String,
    pub optional: bool,
    pub candidates: Vec<LayerCandidate>,
}

/// Verdict of validating one combination's active connections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionsVerdict {
    /// Provided keys carrying non-identical values, detection order
    pub conflicts: Vec<String>,

    /// Consumed pairs without an acceptable provider, consumed order
    pub incompatibles: Vec<(String, String)>,

    /// Overflowed keys with the amount rendered `<sum> > <provided>`
    pub overflows: Vec<(String, String)>,
}

impl ConnectionsVerdict {
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty() && self.incompatibles.is_empty() && self.overflows.is_empty()
    }
}

/// One maximal valid combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Chosen layer file per type, slot order
    pub layers: IndexMap<String, String>,

    /// Active connect items of the combination
    pub active: Vec<ConnectItem>,
}

/// Result of the combination search
#[derive(Debug, Clone, Default)]
pub struct SolverOutcome {
    /// Maximal valid combinations, generation order
    pub configurations: Vec<Configuration>,

    /// Combinations generated before validation
    pub considered: usize,
}

struct Attempt {
    files: IndexMap<String, String>,
    active: Vec<ConnectItem>,
    verdict: ConnectionsVerdict,
}

/// Solve the layer composition for one context.
///
/// `project` holds the project file's own connect items, active in every
/// combination. A required slot without candidates fails immediately; an
/// optional one is skipped. Zero valid combinations is an error carrying
/// the per-combination findings; otherwise subset-redundant combinations
/// are dropped and per-type uniqueness notes are logged.
pub fn solve_connections(
    project: &[ConnectItem],
    slots: &[LayerSlot],
    diagnostics: &mut Diagnostics,
) -> ResolverResult<SolverOutcome> {
    let mut axes: Vec<&LayerSlot> = Vec::new();
    for slot in slots {
        if slot.candidates.is_empty() {
            if slot.optional {
                debug!("skipping optional layer type '{}'", slot.layer_type);
                continue;
            }
            return Err(ResolverError::operation(format!(
                "no clayer matches type '{}'",
                slot.layer_type
            )));
        }
        axes.push(slot);
    }

    let mut attempts: Vec<Attempt> = Vec::new();
    let outer_lens: Vec<usize> = axes.iter().map(|slot| slot.candidates.len()).collect();
    for outer in IndexProduct::new(&outer_lens) {
        let chosen: Vec<&LayerCandidate> = outer
            .iter()
            .zip(&axes)
            .map(|(&index, slot)| &slot.candidates[index])
            .collect();
        let mut files = IndexMap::new();
        for (slot, candidate) in axes.iter().zip(&chosen) {
            files.insert(slot.layer_type.clone(), candidate.filename.clone());
        }

        // set alternatives are local to their owning file
        let mut always: Vec<&ConnectItem> = Vec::new();
        let mut groups: IndexMap<(&str, &str), Vec<&ConnectItem>> = IndexMap::new();
        let all_items = project
            .iter()
            .chain(chosen.iter().flat_map(|c| c.connects.iter()));
        for item in all_items {
            if item.set.is_empty() {
                always.push(item);
            } else {
                groups
                    .entry((item.filename.as_str(), item.set.as_str()))
                    .or_default()
                    .push(item);
            }
        }

        let inner_lens: Vec<usize> = groups.values().map(Vec::len).collect();
        for inner in IndexProduct::new(&inner_lens) {
            if attempts.len() == COMBINATION_CAP {
                return Err(ResolverError::operation(format!(
                    "no valid combination found: the search space exceeds \
                     {COMBINATION_CAP} combinations"
                )));
            }
            let mut active: Vec<ConnectItem> = always.iter().map(|&i| i.clone()).collect();
            for (alternatives, &index) in groups.values().zip(&inner) {
                active.push(alternatives[index].clone());
            }
            let verdict = validate_connections(&active);
            attempts.push(Attempt {
                files: files.clone(),
                active,
                verdict,
            });
        }
    }
    let considered = attempts.len();
    debug!("validated {considered} connection combination(s)");

    if !attempts.iter().any(|a| a.verdict.is_valid()) {
        return Err(no_valid_combination(&attempts));
    }

    // drop combinations whose active-file set is covered by another's
    let file_sets: Vec<Vec<&String>> = attempts
        .iter()
        .map(|attempt| {
            let mut files: Vec<&String> = attempt.files.values().collect();
            files.sort();
            files.dedup();
            files
        })
        .collect();
    let kept: Vec<usize> = (0..attempts.len())
        .filter(|&i| attempts[i].verdict.is_valid())
        .filter(|&i| {
            !(0..attempts.len()).any(|j| {
                j != i
                    && attempts[j].verdict.is_valid()
                    && file_sets[i] != file_sets[j]
                    && file_sets[i].iter().all(|f| file_sets[j].contains(f))
            })
        })
        .collect();

    for slot in &axes {
        let mut distinct: Vec<&str> = kept
            .iter()
            .filter_map(|&i| attempts[i].files.get(&slot.layer_type))
            .map(String::as_str)
            .collect();
        distinct.sort_unstable();
        distinct.dedup();
        match distinct.len() {
            1 => diagnostics.info(format!(
                "clayer of type '{}' was uniquely found",
                slot.layer_type
            )),
            _ => diagnostics.info(format!(
                "multiple clayers match type '{}'",
                slot.layer_type
            )),
        }
    }

    let configurations = kept
        .into_iter()
        .map(|i| Configuration {
            layers: attempts[i].files.clone(),
            active: attempts[i].active.clone(),
        })
        .collect();
    Ok(SolverOutcome {
        configurations,
        considered,
    })
}

/// Validate the active connect items of one combination.
///
/// The first provider of a key supplies the value consumers are matched
/// against; further providers must agree. `+`-prefixed consumed values
/// accumulate against the provided absolute value instead of matching it,
/// and an empty consumed value accepts any provider.
pub fn validate_connections(items: &[ConnectItem]) -> ConnectionsVerdict {
    let mut provided: IndexMap<&str, &str> = IndexMap::new();
    let mut conflicts: Vec<String> = Vec::new();
    for item in items {
        for pair in &item.provides {
            match provided.get(pair.key.as_str()) {
                None => {
                    provided.insert(&pair.key, &pair.value);
                }
                Some(&existing) if existing == pair.value => {}
                Some(_) => {
                    if !conflicts.iter().any(|key| *key == pair.key) {
                        conflicts.push(pair.key.clone());
                    }
                }
            }
        }
    }

    let mut incompatibles: Vec<(String, String)> = Vec::new();
    let mut sums: IndexMap<&str, i64> = IndexMap::new();
    for item in items {
        for pair in &item.consumes {
            let value = pair.value.as_str();
            if let Some(increment) = value.strip_prefix('+') {
                // only an empty or numeric provided value can back increments
                match provided.get(pair.key.as_str()) {
                    Some(&supplied) if supplied.is_empty() || supplied.parse::<i64>().is_ok() => {
                        *sums.entry(pair.key.as_str()).or_insert(0) +=
                            increment.parse::<i64>().unwrap_or(0);
                    }
                    _ => incompatibles.push((pair.key.clone(), pair.value.clone())),
                }
                continue;
            }
            match provided.get(pair.key.as_str()) {
                None => incompatibles.push((pair.key.clone(), pair.value.clone())),
                Some(&supplied) if !value.is_empty() && supplied != value => {
                    incompatibles.push((pair.key.clone(), pair.value.clone()));
                }
                _ => {}
            }
        }
    }

    let mut overflows: Vec<(String, String)> = Vec::new();
    for (key, sum) in &sums {
        let available = provided
            .get(key)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0);
        if *sum > available {
            overflows.push((key.to_string(), format!("{sum} > {available}")));
        }
    }

    ConnectionsVerdict {
        conflicts,
        incompatibles,
        overflows,
    }
}

/// The hard error for a search without any valid combination, carrying
/// every combination's findings
fn no_valid_combination(attempts: &[Attempt]) -> ResolverError {
    let mut message = String::from("no valid combination of connections was found");
    for (index, attempt) in attempts.iter().enumerate() {
        message.push_str(&format!("\ncombination {}:", index + 1));
        if attempt.files.is_empty() {
            message.push_str(" project connections");
        } else {
            let files: Vec<String> = attempt
                .files
                .iter()
                .map(|(layer_type, file)| format!("{layer_type}: {file}"))
                .collect();
            message.push(' ');
            message.push_str(&files.join(", "));
        }
        for key in &attempt.verdict.conflicts {
            message.push_str(&format!("\n  conflict: '{key}'"));
        }
        for (key, value) in &attempt.verdict.incompatibles {
            message.push_str(&format!("\n  incompatible: '{key}' ({value})"));
        }
        for (key, amount) in &attempt.verdict.overflows {
            message.push_str(&format!("\n  overflow: \"{key}\": \"{amount}\""));
        }
    }
    ResolverError::operation(message)
}

/// Odometer over index vectors; the last axis varies fastest. An empty
/// axis list yields exactly one empty combination.
struct IndexProduct {
    lens: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl IndexProduct {
    fn new(lens: &[usize]) -> Self {
        let start = if lens.iter().any(|&len| len == 0) {
            None
        } else {
            Some(vec![0; lens.len()])
        };
        Self {
            lens: lens.to_vec(),
            next: start,
        }
    }
}

impl Iterator for IndexProduct {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut indices = current.clone();
        let mut position = indices.len();
        while position > 0 {
            position -= 1;
            indices[position] += 1;
            if indices[position] < self.lens[position] {
                self.next = Some(indices);
                break;
            }
            indices[position] = 0;
        }
        Some(current)
    }
}
