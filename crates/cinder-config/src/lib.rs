//! # cinder-config
//!
//! Parsing and validation of cinder solution, project and layer files,
//! plus the generated `cinder.lock` pack pinning file.
//!
//! Everything here is input handling; semantic resolution lives in
//! `cinder-resolver`. Parsed values are normalized (requirement strings
//! into [`cinder_core::PackRequirement`], component selections into
//! [`cinder_core::ComponentQuery`]) so the engine never re-parses text.

pub mod layers;
pub mod lock;
pub mod precedence;
pub mod solution;

// Re-export commonly used types
pub use layers::{discover_layers, LayerFile};
pub use lock::{LockFile, LockedPack};
pub use precedence::{collect_board, collect_compiler, collect_device, Leveled, ToolchainItem};
pub use solution::{
    load_project, load_solution, ComponentSelection, ConnectDecl, ConnectPair, LayerRef,
    ProjectFile, SolutionFile, TargetType,
};

use camino::Utf8PathBuf;
use cinder_core::CoreError;
use thiserror::Error;

/// Errors produced while reading configuration input
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {path}: {reason}")]
    Invalid { path: Utf8PathBuf, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
