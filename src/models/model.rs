//! The compiled model: an owned arena of entities plus modules, views, methods
//! and the user interface tree.
//!
//! Entities refer to each other by name. Inheritance queries (ancestors,
//! inherited fields, inherited keys) are answered here by walking those names.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::entity::{Entity, Unique};
use super::field::Field;
use super::module::{Method, Module, View};
use super::ui::UiNode;
use crate::error::{ModelError, ModelResult};

/// Model name used when the document does not set one
pub const DEFAULT_MODEL_NAME: &str = "model";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub label: String,
    pub description: String,
    pub entities: Vec<Entity>,
    pub modules: Vec<Module>,
    pub views: Vec<View>,
    pub methods: Vec<Method>,
    pub ui: UiNode,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_NAME)
    }
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            ui: UiNode::root(name.clone()),
            name,
            description: String::new(),
            entities: Vec::new(),
            modules: Vec::new(),
            views: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name == name)
    }

    /// Exact match first, then a case-insensitive one
    pub fn entity_ignore_case(&self, name: &str) -> Option<&Entity> {
        self.entity(name).or_else(|| {
            self.entities
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    /// Append an entity, rejecting duplicate names
    pub fn add_entity(&mut self, entity: Entity) -> ModelResult<()> {
        if self.has_entity(&entity.name) {
            return Err(ModelError::constraint(format!(
                "duplicate entity '{}' in model '{}'",
                entity.name, self.name
            )));
        }
        self.entities.push(entity);
        Ok(())
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.name.clone()).collect()
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Entities reachable through `extends`, nearest first
    pub fn ancestors(&self, name: &str) -> Vec<&Entity> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(name.to_string());
        self.collect_ancestors(name, &mut visited, &mut result);
        result
    }

    fn collect_ancestors<'a>(
        &'a self,
        name: &str,
        visited: &mut HashSet<String>,
        result: &mut Vec<&'a Entity>,
    ) {
        let Some(entity) = self.entity(name) else {
            return;
        };
        for parent in &entity.parents {
            if !visited.insert(parent.clone()) {
                continue;
            }
            if let Some(p) = self.entity(parent) {
                result.push(p);
                self.collect_ancestors(parent, visited, result);
            }
        }
    }

    /// Topmost entity of the `extends` chain; the entity itself when it has no parents
    pub fn root_of<'a>(&'a self, name: &str) -> Option<&'a Entity> {
        self.ancestors(name)
            .into_iter()
            .rfind(|e| e.parents.is_empty())
            .or_else(|| self.entity(name))
    }

    /// Interfaces implemented by the entity or its ancestors, transitively
    pub fn interfaces(&self, name: &str) -> Vec<&Entity> {
        let mut result: Vec<&Entity> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        if let Some(entity) = self.entity(name) {
            pending.extend(entity.implements.iter().cloned());
        }
        for ancestor in self.ancestors(name) {
            pending.extend(ancestor.implements.iter().cloned());
        }
        let mut visited = HashSet::new();
        while !pending.is_empty() {
            let next = pending.remove(0);
            if next == name || !visited.insert(next.clone()) {
                continue;
            }
            if let Some(interface) = self.entity(&next) {
                pending.extend(interface.implements.iter().cloned());
                result.push(interface);
            }
        }
        result
    }

    /// Entities that have `name` among their ancestors, in model order
    pub fn descendants(&self, name: &str) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| e.name != name && self.ancestors(&e.name).iter().any(|a| a.name == name))
            .collect()
    }

    /// Non-abstract entity without parents that is extended by at least one other entity
    pub fn is_root_ancestor(&self, name: &str) -> bool {
        match self.entity(name) {
            Some(entity) => {
                !entity.is_abstract
                    && entity.parents.is_empty()
                    && !self.descendants(name).is_empty()
            }
            None => false,
        }
    }

    /// Entities whose fields are visible on `name`: interfaces, then ancestors
    /// from the root down, then the entity itself
    fn lineage(&self, name: &str) -> Vec<&Entity> {
        let mut lineage = self.interfaces(name);
        let mut ancestors = self.ancestors(name);
        ancestors.reverse();
        lineage.extend(ancestors);
        if let Some(entity) = self.entity(name) {
            lineage.push(entity);
        }
        lineage
    }

    /// Own and inherited fields. A field redeclared lower in the hierarchy
    /// replaces the inherited one in place.
    pub fn all_fields(&self, name: &str) -> Vec<&Field> {
        let mut fields: Vec<&Field> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for entity in self.lineage(name) {
            for field in &entity.fields {
                match positions.get(field.name.as_str()) {
                    Some(&i) => fields[i] = field,
                    None => {
                        positions.insert(field.name.as_str(), fields.len());
                        fields.push(field);
                    }
                }
            }
        }
        fields
    }

    pub fn all_field(&self, entity: &str, field: &str) -> Option<&Field> {
        self.all_fields(entity).into_iter().find(|f| f.name == field)
    }

    /// Exact match first, then a case-insensitive one
    pub fn all_field_ignore_case(&self, entity: &str, field: &str) -> Option<&Field> {
        let fields = self.all_fields(entity);
        fields
            .iter()
            .find(|f| f.name == field)
            .or_else(|| fields.iter().find(|f| f.name.eq_ignore_ascii_case(field)))
            .copied()
    }

    /// Own and inherited keys, without repeating a key over the same fields
    pub fn all_keys(&self, name: &str) -> Vec<&Unique> {
        let mut keys: Vec<&Unique> = Vec::new();
        for entity in self.lineage(name) {
            for key in &entity.keys {
                if !keys.iter().any(|k| k.fields == key.fields) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// The first key of the entity's hierarchy
    pub fn primary_key(&self, name: &str) -> Option<&Unique> {
        self.all_keys(name).into_iter().next()
    }

    /// Fields of the primary key, resolved against the entity's own and inherited fields
    pub fn primary_key_fields(&self, name: &str) -> Vec<&Field> {
        let Some(key) = self.primary_key(name) else {
            return Vec::new();
        };
        key.fields
            .iter()
            .filter_map(|f| self.all_field(name, f))
            .collect()
    }

    /// Look up an `Entity.field` path
    pub fn find_field(&self, path: &str) -> Option<(&Entity, &Field)> {
        let (entity_name, field_name) = path.split_once('.')?;
        let entity = self.entity_ignore_case(entity_name)?;
        let field = self.all_field_ignore_case(&entity.name, field_name)?;
        Some((entity, field))
    }
}
