//! Type registry: schema type names to canonical field types

use serde::{Deserialize, Serialize};

/// Canonical field type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeName {
    String,
    Int,
    Long,
    Decimal,
    Bool,
    Date,
    DateTime,
    Text,
    File,
    Hyperlink,
    Email,
    Enum,
    Xref,
    Mref,
}

impl TypeName {
    pub fn as_str(&self) -> &'static str {
        CANONICAL
            .iter()
            .find(|(_, t)| t == self)
            .map(|(key, _)| *key)
            .unwrap_or("string")
    }
}

/// Outcome of a type lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedType {
    pub name: TypeName,
    /// Declared as `autoid`: an auto-increment, read-only, unique, non-nillable int
    pub auto_id: bool,
}

const CANONICAL: &[(&str, TypeName)] = &[
    ("string", TypeName::String),
    ("int", TypeName::Int),
    ("long", TypeName::Long),
    ("decimal", TypeName::Decimal),
    ("bool", TypeName::Bool),
    ("date", TypeName::Date),
    ("datetime", TypeName::DateTime),
    ("text", TypeName::Text),
    ("file", TypeName::File),
    ("hyperlink", TypeName::Hyperlink),
    ("email", TypeName::Email),
    ("enum", TypeName::Enum),
    ("xref", TypeName::Xref),
    ("mref", TypeName::Mref),
];

const ALIASES: &[(&str, TypeName)] = &[
    ("varchar", TypeName::String),
    ("number", TypeName::Int),
    ("boolean", TypeName::Bool),
    ("xref_single", TypeName::Xref),
    ("xref_multiple", TypeName::Mref),
];

/// Resolve a type name as written in a schema document (case-insensitive)
pub fn resolve_type(name: &str) -> Option<ResolvedType> {
    let name = name.trim().to_lowercase();
    if name == "autoid" {
        return Some(ResolvedType {
            name: TypeName::Int,
            auto_id: true,
        });
    }
    CANONICAL
        .iter()
        .chain(ALIASES.iter())
        .find(|(key, _)| *key == name)
        .map(|&(_, type_name)| ResolvedType {
            name: type_name,
            auto_id: false,
        })
}

/// All accepted type names, for error messages
pub fn known_type_names() -> Vec<&'static str> {
    CANONICAL
        .iter()
        .chain(ALIASES.iter())
        .map(|(key, _)| *key)
        .chain(std::iter::once("autoid"))
        .collect()
}
