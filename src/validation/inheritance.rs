//! Inheritance normalization
//!
//! Makes `extends`/`implements` hierarchies representable as tables: primary
//! keys are copied down as hidden references, hierarchies get a `type`
//! discriminator or a synthetic identity root, and many-to-many fields of
//! interfaces move to the entities that implement them.

use std::collections::HashSet;
use tracing::debug;

use super::names::{free_link_name, mangle_identifier};
use crate::config::Dialect;
use crate::error::{ModelError, ModelResult, StructuralWarning, WarningKind};
use crate::models::{Entity, Field, FieldOrigin, FieldType, Model, Unique};

/// Name of the discriminator field
pub const DISCRIMINATOR: &str = "type";

/// Interfaces named by the entity's own `implements`, followed transitively
fn own_interfaces(model: &Model, name: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut pending: Vec<String> = model
        .entity(name)
        .map(|e| e.implements.clone())
        .unwrap_or_default();
    let mut visited = HashSet::new();
    while !pending.is_empty() {
        let next = pending.remove(0);
        if next == name || !visited.insert(next.clone()) {
            continue;
        }
        if let Some(interface) = model.entity(&next) {
            pending.extend(interface.implements.iter().cloned());
        }
        result.push(next);
    }
    result
}

/// True when following `edges` from `start` leads back to it
fn in_cycle(model: &Model, start: &str, edges: fn(&Entity) -> &Vec<String>) -> bool {
    let mut pending = vec![start.to_string()];
    let mut visited = HashSet::new();
    while let Some(current) = pending.pop() {
        let Some(entity) = model.entity(&current) else {
            continue;
        };
        for next in edges(entity) {
            if next == start {
                return true;
            }
            if visited.insert(next.clone()) {
                pending.push(next.clone());
            }
        }
    }
    false
}

/// Upper-case the first letter
pub fn first_upper(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Check `extends`/`implements` targets and reject inheritance cycles
pub fn validate_hierarchy(model: &Model) -> ModelResult<()> {
    for entity in &model.entities {
        for interface in &entity.implements {
            let target = model.entity(interface).ok_or_else(|| {
                ModelError::reference(format!(
                    "entity '{}' implements unknown interface '{}'",
                    entity.name, interface
                ))
            })?;
            if !target.is_abstract {
                return Err(ModelError::reference(format!(
                    "entity '{}' implements '{}', which is not abstract; use extends",
                    entity.name, interface
                )));
            }
        }
        if entity.is_abstract && !entity.parents.is_empty() {
            return Err(ModelError::constraint(format!(
                "abstract entity '{}' cannot extend '{}'; use implements",
                entity.name,
                entity.parents.join(",")
            )));
        }
        for parent in &entity.parents {
            let target = model.entity(parent).ok_or_else(|| {
                ModelError::reference(format!(
                    "entity '{}' extends unknown entity '{}'",
                    entity.name, parent
                ))
            })?;
            if target.is_abstract {
                return Err(ModelError::reference(format!(
                    "entity '{}' extends '{}', which is abstract; use implements",
                    entity.name, parent
                )));
            }
        }
        if in_cycle(model, &entity.name, |e| &e.parents) {
            return Err(ModelError::constraint(format!(
                "inheritance cycle: entity '{}' extends itself",
                entity.name
            )));
        }
        if in_cycle(model, &entity.name, |e| &e.implements) {
            return Err(ModelError::constraint(format!(
                "inheritance cycle: interface '{}' implements itself",
                entity.name
            )));
        }
    }
    Ok(())
}

/// Copy interface and parent primary keys down the hierarchy
pub fn propagate_keys(model: &mut Model) -> ModelResult<()> {
    validate_hierarchy(model)?;

    for name in model.entity_names() {
        let mut copies = Vec::new();
        for interface in own_interfaces(model, &name) {
            let Some(key) = model.primary_key(&interface) else {
                continue;
            };
            if key.fields.len() != 1 {
                continue;
            }
            let Some(key_field) = model.all_field(&interface, &key.fields[0]) else {
                continue;
            };
            let already = copies.iter().any(|c: &Field| c.name == key_field.name);
            if model.entity(&name).is_some_and(|e| e.has_field(&key_field.name)) || already {
                continue;
            }
            debug!(entity = %name, interface = %interface, field = %key_field.name, "copied interface key");
            copies.push(key_field.reference_copy(&interface, FieldOrigin::InheritedKey));
        }
        if let Some(entity) = model.entity_mut(&name) {
            for (i, copy) in copies.into_iter().enumerate() {
                entity.insert_field(i, copy)?;
            }
        }
    }

    let mut names = model.entity_names();
    names.sort_by_key(|name| model.ancestors(name).len());
    for name in names {
        let parents = model.entity(&name).map(|e| e.parents.clone()).unwrap_or_default();
        for parent in parents {
            let key_fields: Vec<Field> = model
                .primary_key_fields(&parent)
                .into_iter()
                .cloned()
                .collect();
            if key_fields.is_empty() {
                return Err(ModelError::constraint(format!(
                    "entity '{}' extends '{}', which has no primary key",
                    name, parent
                )));
            }
            let Some(entity) = model.entity_mut(&name) else {
                continue;
            };
            let mut key = Vec::new();
            for field in key_fields {
                key.push(field.name.clone());
                if entity.has_field(&field.name) {
                    continue;
                }
                let mut copy = field.reference_copy(&parent, FieldOrigin::InheritedKey);
                copy.system = true;
                debug!(entity = %name, parent = %parent, field = %copy.name, "copied parent key");
                entity.add_field(copy)?;
            }
            if !entity.has_key(&key) {
                entity.insert_key(0, Unique::new(key))?;
            }
        }
    }
    Ok(())
}

/// Own fields that redeclare an inherited field must keep its type
pub fn check_overrides(model: &Model) -> ModelResult<()> {
    for entity in &model.entities {
        let inherited: Vec<&Entity> = model
            .ancestors(&entity.name)
            .into_iter()
            .chain(model.interfaces(&entity.name))
            .collect();
        for field in entity.fields.iter().filter(|f| f.origin == FieldOrigin::Declared) {
            for source in &inherited {
                let Some(other) = source.field(&field.name) else {
                    continue;
                };
                if other.origin == FieldOrigin::Declared
                    && other.field_type.name() != field.field_type.name()
                {
                    return Err(ModelError::constraint(format!(
                        "field '{}.{}' overrides '{}.{}' but changes its type from {} to {}",
                        entity.name,
                        field.name,
                        source.name,
                        other.name,
                        other.field_type.name(),
                        field.field_type.name()
                    )));
                }
            }
        }
    }
    Ok(())
}

fn hierarchy_options(model: &Model, root: &str) -> Vec<String> {
    std::iter::once(first_upper(root))
        .chain(model.descendants(root).iter().map(|e| first_upper(&e.name)))
        .collect()
}

fn discriminator_field(options: Vec<String>) -> Field {
    let mut field = Field::new(DISCRIMINATOR, FieldType::Enum { options });
    field.auto = true;
    field.readonly = true;
    field.hidden = true;
    field.origin = FieldOrigin::Discriminator;
    field
}

/// Subclass-per-table: `type` enum on each root ancestor, none below it
pub fn add_discriminators(model: &mut Model) -> ModelResult<Vec<StructuralWarning>> {
    let mut warnings = Vec::new();
    for name in model.entity_names() {
        let is_root = model.is_root_ancestor(&name);
        let has_parents = model.entity(&name).is_some_and(|e| !e.parents.is_empty());
        if !is_root && !has_parents {
            continue;
        }
        let options = hierarchy_options(model, &name);
        let Some(entity) = model.entity_mut(&name) else {
            continue;
        };
        if let Some(existing) = entity.remove_field(DISCRIMINATOR) {
            if existing.origin == FieldOrigin::Declared {
                warnings.push(StructuralWarning::new(
                    WarningKind::Discriminator,
                    format!(
                        "field '{}.{}' was replaced by the inheritance discriminator",
                        name, DISCRIMINATOR
                    ),
                ));
            }
        }
        if is_root {
            let mut field = discriminator_field(options);
            field.description = Some("Subtypes have to be set to allow searching".to_string());
            debug!(entity = %name, "added discriminator");
            entity.insert_field(0, field)?;
        }
    }
    Ok(warnings)
}

/// Move many-to-many fields of interfaces onto their implementers and strip
/// them from every abstract entity
pub fn relocate_interface_mrefs(model: &mut Model, dialect: Dialect) -> ModelResult<()> {
    let limit = dialect.identifier_limit();
    let mut taken: HashSet<String> = model.entity_names().into_iter().collect();
    for entity in &model.entities {
        for field in &entity.fields {
            if let Some(name) = field.field_type.mref_link().and_then(|l| l.name.clone()) {
                taken.insert(name);
            }
        }
    }

    for name in model.entity_names() {
        if model.entity(&name).is_some_and(|e| e.is_abstract) {
            continue;
        }
        let mut copies = Vec::new();
        for interface in own_interfaces(model, &name) {
            let Some(source) = model.entity(&interface) else {
                continue;
            };
            for field in source.fields.iter().filter(|f| f.field_type.is_mref()) {
                let exists = model.entity(&name).is_some_and(|e| e.has_field(&field.name));
                if exists || copies.iter().any(|c: &Field| c.name == field.name) {
                    continue;
                }
                let mut copy = field.clone();
                copy.origin = FieldOrigin::InterfaceMref;
                if let FieldType::Mref { target, link } = &mut copy.field_type {
                    let link_name = free_link_name(&format!("{}_{}", name, field.name), limit, &taken);
                    taken.insert(link_name.clone());
                    link.name = Some(link_name);
                    let remote = link.remote_id.clone().unwrap_or_else(|| target.entity.clone());
                    link.local_id = Some(if remote == name {
                        mangle_identifier(&format!("{}_self", name), limit)
                    } else {
                        name.clone()
                    });
                    link.remote_id = Some(remote);
                }
                debug!(entity = %name, interface = %interface, field = %field.name, "moved interface mref");
                copies.push(copy);
            }
        }
        if let Some(entity) = model.entity_mut(&name) {
            for copy in copies {
                entity.add_field(copy)?;
            }
        }
    }

    for entity in model.entities.iter_mut().filter(|e| e.is_abstract) {
        entity.fields.retain(|f| !f.field_type.is_mref());
    }
    Ok(())
}

/// Entities without a decorator take the nearest ancestor's, then an interface's
pub fn propagate_decorators(model: &mut Model) {
    let mut assigned = Vec::new();
    for entity in model.entities.iter().filter(|e| e.decorator.is_none()) {
        let inherited = model
            .ancestors(&entity.name)
            .into_iter()
            .chain(model.interfaces(&entity.name))
            .find_map(|e| e.decorator.clone());
        if let Some(decorator) = inherited {
            assigned.push((entity.name.clone(), decorator));
        }
    }
    for (name, decorator) in assigned {
        debug!(entity = %name, decorator = %decorator, "inherited decorator");
        if let Some(entity) = model.entity_mut(&name) {
            entity.decorator = Some(decorator);
        }
    }
}

/// Class-per-table: an abstract `_<Root>Interface` owning the identity of
/// each hierarchy
pub fn add_interface_roots(model: &mut Model) -> ModelResult<()> {
    let roots: Vec<String> = model
        .entity_names()
        .into_iter()
        .filter(|name| model.is_root_ancestor(name))
        .collect();

    for root in roots {
        let Some(entity) = model.entity(&root) else {
            continue;
        };
        let mut interface = Entity::new(format!("_{}Interface", root));
        interface.is_abstract = true;
        interface.label = root.clone();
        interface.namespace = entity.namespace.clone();
        interface.module = entity.module.clone();
        interface.description = Some(format!(
            "Identity map table for {} and all its subclasses",
            root
        ));

        for field in model.primary_key_fields(&root) {
            interface.add_field(field.clone())?;
        }
        if let Some(key) = model.primary_key(&root) {
            let mut copy = Unique::new(key.fields.clone());
            copy.subclass = key.subclass;
            interface.add_key(copy)?;
        }
        let mut discriminator = discriminator_field(hierarchy_options(model, &root));
        discriminator.readonly = false;
        interface.insert_field(0, discriminator)?;

        debug!(entity = %root, interface = %interface.name, "added identity root");
        let interface_name = interface.name.clone();
        model.add_entity(interface)?;
        if let Some(entity) = model.entity_mut(&root) {
            entity.parents = vec![interface_name];
        }
    }
    Ok(())
}

/// Fields named in a local key but only declared on an ancestor are copied in
pub fn copy_constraint_fields(model: &mut Model) -> ModelResult<()> {
    for name in model.entity_names() {
        let Some(entity) = model.entity(&name) else {
            continue;
        };
        let mut copies: Vec<Field> = Vec::new();
        for key in &entity.keys {
            for field_name in &key.fields {
                if entity.has_field(field_name) || copies.iter().any(|c| &c.name == field_name) {
                    continue;
                }
                let inherited = model.all_field(&name, field_name).ok_or_else(|| {
                    ModelError::reference(format!(
                        "key field '{}' of entity '{}' does not exist",
                        field_name, name
                    ))
                })?;
                let mut copy = inherited.clone();
                copy.system = true;
                copy.origin = FieldOrigin::ConstraintCopy;
                copies.push(copy);
            }
        }
        if let Some(entity) = model.entity_mut(&name) {
            for copy in copies {
                debug!(entity = %name, field = %copy.name, "copied key field from ancestor");
                entity.add_field(copy)?;
            }
        }
    }
    Ok(())
}
