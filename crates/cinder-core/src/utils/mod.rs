//! Utility functions and helpers.
//!
//! Wildcard identifier matching, word filters for list operations, and
//! natural alphanumeric comparison.

pub mod alnum;
pub mod filter;
pub mod wildcard;

// Re-export commonly used utilities
pub use filter::apply_filter;
pub use wildcard::{has_wildcards, matches as wildcard_match};
