//! Data Model Compiler - turns XML schema declarations into a validated model
//!
//! Provides:
//! - db-schema and ui-schema import
//! - Inheritance normalization and key propagation
//! - Reference resolution and join entities for many-to-many fields
//! - Dialect checks (reserved words, identifier lengths)
//! - Dependency ordering of entities

pub mod compiler;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod validation;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use compiler::{CompiledModel, ModelCompiler};
pub use config::{CompilerOptions, Dialect, MappingStrategy};
pub use error::{ErrorKind, ModelError, ModelResult, StructuralWarning, WarningKind};
pub use import::{FileIncludeResolver, IncludeResolver, NoIncludes, SchemaParser, UiParser};
pub use validation::{DependencyOrder, DependencyOrderer};

// Re-export models
pub use models::{Entity, Field, FieldOrigin, FieldType, Model, MrefLink, Unique, XrefTarget};
