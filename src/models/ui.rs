//! User interface tree: menus, forms, trees and plugins

use serde::{Deserialize, Serialize};

/// Default page size of a form
pub const DEFAULT_FORM_LIMIT: usize = 10;

/// Initial layout of a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormView {
    List,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filter applied to a form's records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFilter {
    pub field: String,
    pub filter_type: String,
    pub value: Option<String>,
}

/// Form editing the records of one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSpec {
    pub entity: String,
    pub view: FormView,
    pub limit: usize,
    pub readonly: bool,
    pub header: Option<String>,
    pub description: Option<String>,
    pub commands: Vec<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub filter: Option<FormFilter>,
    /// Fields not shown, with the casing of the entity's fields
    pub hide_fields: Vec<String>,
    /// Fields of the compact listing as `Entity_field`
    pub compact_view: Vec<String>,
}

/// Hierarchical browser over a self-referencing entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSpec {
    pub entity: String,
    pub parent_field: String,
    pub id_field: String,
    pub label_field: String,
    pub readonly: bool,
}

/// Custom screen implemented outside the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub plugin_type: String,
    pub flavor: Option<String>,
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UiKind {
    Root,
    Menu { position: Option<String> },
    Form(FormSpec),
    Tree(TreeSpec),
    Plugin(PluginSpec),
}

/// Node of the user interface tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiNode {
    pub name: String,
    pub label: String,
    pub namespace: String,
    /// Group with read/write access
    pub group: Option<String>,
    /// Group with read access
    pub group_read: Option<String>,
    pub kind: UiKind,
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn root(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            namespace: String::new(),
            group: None,
            group_read: None,
            kind: UiKind::Root,
            children: Vec::new(),
        }
    }

    /// This node followed by all of its descendants, depth first
    pub fn walk(&self) -> Vec<&UiNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// All forms in the subtree
    pub fn forms(&self) -> Vec<&FormSpec> {
        self.walk()
            .into_iter()
            .filter_map(|node| match &node.kind {
                UiKind::Form(form) => Some(form),
                _ => None,
            })
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<&UiNode> {
        self.walk().into_iter().find(|node| node.name == name)
    }
}
