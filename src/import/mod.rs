//! Import functionality
//!
//! Provides parsers for the two schema document kinds:
//! - db-schema (entities, fields, keys, modules, views, methods)
//! - ui-schema (menus, forms, trees, plugins, includes)

pub mod db_schema;
pub mod document;
pub mod types;
pub mod ui_schema;

pub use db_schema::SchemaParser;
pub use document::{XmlElement, parse_document};
pub use types::{ResolvedType, TypeName, known_type_names, resolve_type};
pub use ui_schema::{FileIncludeResolver, IncludeResolver, NoIncludes, UiParser};
