//! Error and warning types for schema compilation
//!
//! Fatal problems are reported as [`ModelError`] and abort the compilation at
//! the first occurrence. Advisory problems are collected as
//! [`StructuralWarning`] values and never stop the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a compilation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelError {
    /// Malformed or disallowed element/attribute in an input document
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Unknown or inconsistent field type
    #[error("Type error: {0}")]
    Type(String),

    /// Unresolved or illegal entity/field/label target
    #[error("Reference error: {0}")]
    Reference(String),

    /// Broken key, naming or uniqueness constraint
    #[error("Constraint error: {0}")]
    Constraint(String),

    /// Document is not well-formed XML
    #[error("XML parsing error at position {position}: {message}")]
    Xml { position: u64, message: String },

    /// An included ui-schema document could not be loaded
    #[error("Failed to include '{file}': {reason}")]
    Include { file: String, reason: String },
}

/// Error category, independent of the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Syntax,
    Type,
    Reference,
    Constraint,
}

impl ModelError {
    pub fn syntax(message: impl Into<String>) -> Self {
        ModelError::Syntax(message.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ModelError::Type(message.into())
    }

    pub fn reference(message: impl Into<String>) -> Self {
        ModelError::Reference(message.into())
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        ModelError::Constraint(message.into())
    }

    /// Category of this error. Document-level failures count as syntax errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Syntax(_) | ModelError::Xml { .. } | ModelError::Include { .. } => {
                ErrorKind::Syntax
            }
            ModelError::Type(_) => ErrorKind::Type,
            ModelError::Reference(_) => ErrorKind::Reference,
            ModelError::Constraint(_) => ErrorKind::Constraint,
        }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// What a structural warning is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Entities that could not be placed in dependency order
    DependencyCycle,
    /// Incomplete filter configuration on a field or form
    Filter,
    /// A hidden column that the user can never fill in
    HiddenField,
    /// A user-declared discriminator field was dropped from a subclass
    Discriminator,
    /// Element that is accepted but has no effect
    IgnoredElement,
}

/// Non-fatal issue found during compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl StructuralWarning {
    /// Create a warning and log it.
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(?kind, "{}", message);
        Self { kind, message }
    }
}

impl std::fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
