//! Models module
//!
//! Defines the intermediate representation produced by the compiler.
//! All types serialize with serde so generators can consume them as JSON.

pub mod entity;
pub mod field;
pub mod model;
pub mod module;
pub mod ui;

pub use entity::{Entity, Index, Unique};
pub use field::{
    DEFAULT_STRING_LENGTH, Field, FieldFilter, FieldOrigin, FieldType, MrefLink, XrefTarget,
};
pub use model::{DEFAULT_MODEL_NAME, Model};
pub use module::{Method, MethodQuery, Module, Parameter, QueryRule, View};
pub use ui::{
    DEFAULT_FORM_LIMIT, FormFilter, FormSpec, FormView, PluginSpec, SortOrder, TreeSpec, UiKind,
    UiNode,
};
