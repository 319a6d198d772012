//! Error types and result aliases for the core types.
//!
//! Syntax and merge errors carry the offending text literally so callers
//! can surface them without reformatting.

use thiserror::Error;

/// Errors produced while parsing identifiers or merging attributes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid version '{text}': {reason}")]
    VersionSyntax { text: String, reason: String },

    #[error("invalid identifier '{text}': {reason}")]
    IdentifierSyntax { text: String, reason: String },

    #[error("redefinition of '{key}' from '{existing}' ({existing_source}) into '{incoming}' ({incoming_source}) is not allowed")]
    Redefinition {
        key: String,
        existing: String,
        existing_source: String,
        incoming: String,
        incoming_source: String,
    },
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a version syntax error
    pub fn version_syntax(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VersionSyntax {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Create an identifier syntax error
    pub fn identifier_syntax(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IdentifierSyntax {
            text: text.into(),
            reason: reason.into(),
        }
    }
}
