//! Entity model

use serde::{Deserialize, Serialize};

use super::field::Field;
use crate::error::{ModelError, ModelResult};

/// Unique key over one or more fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unique {
    pub fields: Vec<String>,
    /// Key only holds within a subclass
    pub subclass: bool,
    pub description: Option<String>,
}

impl Unique {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            subclass: false,
            description: None,
        }
    }
}

/// Named index over one or more fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub fields: Vec<String>,
}

/// A logical table of the model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub label: String,
    /// Dotted module path, empty for top-level entities
    pub namespace: String,
    pub module: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub system: bool,
    /// Synthesized join entity of a many-to-many field
    pub association: bool,
    pub authorizable: bool,
    /// Entities this one extends
    pub parents: Vec<String>,
    /// Abstract interfaces this one implements
    pub implements: Vec<String>,
    pub fields: Vec<Field>,
    pub keys: Vec<Unique>,
    pub indices: Vec<Index>,
    pub decorator: Option<String>,
    /// Fields shown when another entity refers to this one
    pub xref_labels: Option<Vec<String>>,
    pub allocation_size: Option<u32>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            ..Default::default()
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn field_ignore_case(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Append a field, rejecting duplicate names
    pub fn add_field(&mut self, field: Field) -> ModelResult<()> {
        self.insert_field(self.fields.len(), field)
    }

    /// Insert a field at `position`, rejecting duplicate names
    pub fn insert_field(&mut self, position: usize, field: Field) -> ModelResult<()> {
        if self.has_field(&field.name) {
            return Err(ModelError::constraint(format!(
                "duplicate field '{}' in entity '{}'",
                field.name, self.name
            )));
        }
        let position = position.min(self.fields.len());
        self.fields.insert(position, field);
        Ok(())
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        let position = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(position))
    }

    pub fn has_key(&self, fields: &[String]) -> bool {
        self.keys.iter().any(|k| k.fields == fields)
    }

    /// Append a key, rejecting a second key over the same fields
    pub fn add_key(&mut self, key: Unique) -> ModelResult<()> {
        self.insert_key(self.keys.len(), key)
    }

    pub fn insert_key(&mut self, position: usize, key: Unique) -> ModelResult<()> {
        if self.has_key(&key.fields) {
            return Err(ModelError::constraint(format!(
                "duplicate unique key ({}) in entity '{}'",
                key.fields.join(","),
                self.name
            )));
        }
        let position = position.min(self.keys.len());
        self.keys.insert(position, key);
        Ok(())
    }

    /// Add an index; an index with the same name is ignored
    pub fn add_index(&mut self, index: Index) -> bool {
        if self.indices.iter().any(|i| i.name == index.name) {
            tracing::debug!(entity = %self.name, index = %index.name, "skipping duplicate index");
            return false;
        }
        self.indices.push(index);
        true
    }

    /// Rename a field and every key and index that mentions it
    pub fn rename_field(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        if let Some(field) = self.field_mut(old) {
            field.name = new.to_string();
        }
        let rename = |names: &mut Vec<String>| {
            for name in names.iter_mut().filter(|n| n.as_str() == old) {
                *name = new.to_string();
            }
        };
        for key in &mut self.keys {
            rename(&mut key.fields);
        }
        for index in &mut self.indices {
            rename(&mut index.fields);
        }
        if let Some(labels) = self.xref_labels.as_mut() {
            rename(labels);
        }
    }

    /// Fields of the local primary key (the first key)
    pub fn local_primary_key(&self) -> Option<&Unique> {
        self.keys.first()
    }
}
