//! # cinder-resolver
//!
//! The resolution and compatibility engine: pack and version resolution,
//! device/board/processor precedence, component and variant selection,
//! dependency validation with a severity taxonomy, and the combinatorial
//! layer-connection solver.
//!
//! The engine is a library; each build context runs its pipeline
//! start-to-finish and accumulates diagnostics into its own append-only
//! log. A failing context never aborts its siblings.

pub mod components;
pub mod conditions;
pub mod connections;
pub mod context;
pub mod dependencies;
pub mod packs;
pub mod session;
pub mod target;

// Re-export main types
pub use components::{Candidate, ComponentPool, UsedComponent};
pub use conditions::{ConditionEvaluator, ValidationResult};
pub use connections::{
    solve_connections, validate_connections, ConnectItem, ConnectionsVerdict, Configuration,
    LayerCandidate, LayerSlot, SolverOutcome,
};
pub use context::{Context, Diagnostic, Diagnostics, Severity, SharedLog};
pub use dependencies::{ComponentValidation, UnmetRule, ValidationReport};
pub use packs::{resolve_packs, PackPolicy, ResolvedPackRef};
pub use session::{ContextVerdict, Session};
pub use target::{resolve_target, ResolvedTarget, TargetInput};

use cinder_config::ConfigError;
use cinder_core::CoreError;
use cinder_registry::RegistryError;
use thiserror::Error;

/// Errors crossing the engine boundary
#[derive(Debug, Error)]
pub enum ResolverError {
    /// An engine operation failed; the message is user-facing
    #[error("{message}")]
    Operation { message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ResolverError {
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }
}

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;
