//! # cinder-registry
//!
//! Installed-pack handling for cinder: the on-disk `pack.toml`
//! description model, the pack-root scanner, and the read-only
//! [`PackIndex`] snapshot the resolution engine works against.
//!
//! Loading fully completes (including duplicate collapsing) before any
//! context resolution begins; resolution only ever holds shared
//! references into the index.

pub mod index;
pub mod loader;
pub mod model;

// Re-export commonly used types
pub use index::PackIndex;
pub use loader::{load_pack_roots, LoadNote, LoadOutcome, NoteSeverity};
pub use model::{
    Api, Board, Component, Condition, ConditionRule, Device, Pack, Processor, RegistryError,
    RegistryResult, RuleKind,
};
