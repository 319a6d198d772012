//! # cinder-core
//!
//! Core types and utilities shared across all cinder crates.
//!
//! This crate provides:
//! - Version and VersionMatch types with the constraint grammar used in
//!   pack and component identifiers
//! - PackId, PackRequirement, ComponentId and the target spec types
//! - Attribute bags with ordered-source merging
//! - CoreError enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, PackId, Attributes, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Wildcard matching, list filtering, natural comparison

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{CoreError, CoreResult};
pub use types::{
    AttrMerge, Attributes, BoardSpec, ComponentId, ComponentQuery, DeviceSpec, PackId,
    PackRequirement, Version, VersionMatch,
};
