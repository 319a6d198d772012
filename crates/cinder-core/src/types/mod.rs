//! Core data types for build-configuration resolution.
//!
//! This module provides the fundamental types used throughout cinder:
//! - Version and constraint types for pack/component matching
//! - Pack, component, device, and board identifiers
//! - Attribute bags with ordered-source merging

pub mod attributes;
pub mod ids;
pub mod version;

// Re-export all public types
pub use attributes::{keys, AttrMerge, Attributes, CONFIGURABLE};
pub use ids::{BoardSpec, ComponentId, ComponentQuery, DeviceSpec, PackId, PackRequirement};
pub use version::{Version, VersionMatch};
