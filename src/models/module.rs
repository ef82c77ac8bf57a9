//! Modules, views and methods

use serde::{Deserialize, Serialize};

/// Namespace container for entities
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Module {
    /// Dotted `model.module` path
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    /// Names of the entities declared inside the module
    pub entities: Vec<String>,
}

/// Read-only aggregation over two or more entities
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub label: String,
    pub entities: Vec<String>,
    /// Pairs `(from, to)` where `from` holds a reference to `to`.
    /// Computed for information only.
    pub join_pairs: Vec<(String, String)>,
}

/// Parameter of a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub label: String,
    /// Canonical type name
    pub kind: String,
    pub default_value: Option<String>,
}

/// Condition of a method query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRule {
    pub field: String,
    pub operator: String,
    pub parameter: String,
}

/// Query a method runs against an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodQuery {
    pub entity: String,
    pub rules: Vec<QueryRule>,
}

/// Named service operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub query: Option<MethodQuery>,
}

impl Method {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}
