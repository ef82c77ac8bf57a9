//! Join entities for many-to-many fields
//!
//! Every mref is backed by an association entity named by its `mref_name`.
//! The entity holds a hidden auto-increment key that keeps the relation
//! ordered, a column referring to the target and one column per primary-key
//! field of the owner. A second mref naming the same join entity (the other
//! side of a bidirectional relation) reuses it.

use tracing::debug;

use super::names::mangle_identifier;
use crate::config::Dialect;
use crate::error::{ModelError, ModelResult};
use crate::models::{
    Entity, Field, FieldOrigin, FieldType, Model, MrefLink, Unique, XrefTarget,
};

/// Name of the hidden key column of a join entity
pub const LINK_ID: &str = "autoid";

fn link_column(name: String, target: XrefTarget) -> Field {
    let mut field = Field::new(name, FieldType::Xref(target));
    field.origin = FieldOrigin::LinkTable;
    field
}

fn build_join_entity(
    model: &Model,
    owner: &Entity,
    field: &Field,
    link: &MrefLink,
    link_name: &str,
    dialect: Dialect,
) -> ModelResult<Entity> {
    let context = format!("{}.{}", owner.name, field.name);
    let (Some(local_id), Some(remote_id)) = (link.local_id.clone(), link.remote_id.clone()) else {
        return Err(ModelError::constraint(format!(
            "mref {} has no mref_localid/mref_remoteid",
            context
        )));
    };
    let target = field
        .xref()
        .ok_or_else(|| ModelError::type_error(format!("{} is not a reference", context)))?;

    let mut join = Entity::new(link_name);
    join.system = true;
    join.association = true;
    join.namespace = owner.namespace.clone();
    join.module = owner.module.clone();
    join.description = Some(format!(
        "Link table for many-to-many relationship '{}'.",
        context
    ));

    let mut autoid = Field::auto_id(LINK_ID);
    autoid.origin = FieldOrigin::LinkTable;
    join.add_field(autoid)?;
    join.add_key(Unique::new(vec![LINK_ID.to_string()]))?;

    let mut columns = Vec::new();
    let key_fields = model.primary_key_fields(&owner.name);
    if key_fields.is_empty() {
        return Err(ModelError::constraint(format!(
            "mref {} needs a primary key on '{}'",
            context, owner.name
        )));
    }
    let composite = key_fields.len() > 1;
    for key_field in key_fields {
        let name = if composite {
            mangle_identifier(
                &format!("{}_{}", local_id, key_field.name),
                dialect.identifier_limit(),
            )
        } else {
            local_id.clone()
        };
        let mut local = XrefTarget::new(owner.name.clone());
        local.field = Some(key_field.name.clone());
        local.labels = vec![key_field.name.clone()];
        join.add_field(link_column(name.clone(), local))?;
        columns.push(name);
    }

    join.add_field(link_column(remote_id.clone(), target.clone()))?;
    columns.push(remote_id);
    join.add_key(Unique::new(columns))?;
    Ok(join)
}

/// Align an mref with a join entity that already exists, either declared in
/// the schema or created for the other side of the relation
fn reuse_join_entity(
    model: &mut Model,
    owner: &str,
    field_index: usize,
    link_name: &str,
) -> ModelResult<()> {
    let Some(field) = model.entity(owner).map(|e| e.fields[field_index].clone()) else {
        return Ok(());
    };
    let context = format!("{}.{}", owner, field.name);
    let (Some(target), Some(link)) = (field.xref(), field.field_type.mref_link()) else {
        return Ok(());
    };
    let Some(join) = model.entity(link_name) else {
        return Ok(());
    };

    let references = |entity: &str| -> Vec<String> {
        join.fields
            .iter()
            .filter(|f| !f.field_type.is_mref() && f.xref_entity() == Some(entity))
            .map(|f| f.name.clone())
            .collect()
    };
    let remote_columns = references(&target.entity);
    let remote = remote_columns
        .iter()
        .find(|c| Some(c.as_str()) == link.remote_id.as_deref())
        .or_else(|| remote_columns.first())
        .cloned()
        .ok_or_else(|| {
            ModelError::reference(format!(
                "link entity '{}' of {} has no column referring to '{}'",
                link_name, context, target.entity
            ))
        })?;
    let local = references(owner)
        .into_iter()
        .find(|c| *c != remote)
        .ok_or_else(|| {
            ModelError::reference(format!(
                "link entity '{}' of {} has no column referring to '{}'",
                link_name, context, owner
            ))
        })?;
    let labels = target.labels.clone();

    debug!(field = %context, link = %link_name, "reusing join entity");
    if let Some(column) = model
        .entity_mut(link_name)
        .and_then(|join| join.field_mut(&remote))
        .and_then(|column| column.xref_mut())
    {
        column.labels = labels;
    }
    if let Some(link) = model
        .entity_mut(owner)
        .and_then(|entity| entity.fields[field_index].field_type.mref_link_mut())
    {
        link.local_id = Some(local);
        link.remote_id = Some(remote);
    }
    Ok(())
}

/// Create the join entity of every mref; returns the names of the new entities
pub fn synthesize_link_tables(model: &mut Model, dialect: Dialect) -> ModelResult<Vec<String>> {
    let mut created = Vec::new();
    for owner in model.entity_names() {
        let Some(entity) = model.entity(&owner) else {
            continue;
        };
        if entity.is_abstract {
            continue;
        }
        let mrefs: Vec<usize> = entity
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.field_type.is_mref())
            .map(|(i, _)| i)
            .collect();

        for index in mrefs {
            let Some(entity) = model.entity(&owner) else {
                continue;
            };
            let field = &entity.fields[index];
            let link = field.field_type.mref_link().cloned().unwrap_or_default();
            let link_name = link.name.clone().ok_or_else(|| {
                ModelError::constraint(format!(
                    "mref {}.{} has no mref_name",
                    owner, field.name
                ))
            })?;

            if model.has_entity(&link_name) {
                reuse_join_entity(model, &owner, index, &link_name)?;
                continue;
            }
            let join = build_join_entity(model, entity, field, &link, &link_name, dialect)?;
            debug!(field = %format!("{}.{}", owner, field.name), link = %link_name, "created join entity");
            model.add_entity(join)?;
            created.push(link_name);
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> Entity {
        let mut e = Entity::new(name);
        e.add_field(Field::auto_id("id")).unwrap();
        e.add_key(Unique::new(vec!["id".to_string()])).unwrap();
        e
    }

    fn mref(name: &str, target: &str, link: &str, local: &str, remote: &str) -> Field {
        let mut xref = XrefTarget::new(target);
        xref.field = Some("id".to_string());
        xref.labels = vec!["id".to_string()];
        Field::new(
            name,
            FieldType::Mref {
                target: xref,
                link: MrefLink {
                    name: Some(link.to_string()),
                    local_id: Some(local.to_string()),
                    remote_id: Some(remote.to_string()),
                },
            },
        )
    }

    #[test]
    fn test_join_entity_shape() {
        let mut model = Model::new("m");
        let mut a = entity("A");
        a.add_field(mref("bs", "B", "AB", "A", "B")).unwrap();
        model.add_entity(a).unwrap();
        model.add_entity(entity("B")).unwrap();

        let created = synthesize_link_tables(&mut model, Dialect::Generic).unwrap();
        assert_eq!(created, vec!["AB".to_string()]);

        let join = model.entity("AB").unwrap();
        assert!(join.association && join.system);
        assert_eq!(
            join.description.as_deref(),
            Some("Link table for many-to-many relationship 'A.bs'.")
        );
        let names: Vec<&str> = join.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["autoid", "A", "B"]);
        assert!(join.fields[0].hidden && join.fields[0].auto);
        assert_eq!(join.field("A").unwrap().xref_entity(), Some("A"));
        assert_eq!(join.field("B").unwrap().xref_entity(), Some("B"));
        assert_eq!(join.keys[1].fields, vec!["A".to_string(), "B".to_string()]);
        assert!(join.fields.iter().all(|f| f.origin == FieldOrigin::LinkTable));
    }

    #[test]
    fn test_composite_owner_key() {
        let mut model = Model::new("m");
        let mut a = Entity::new("A");
        a.add_field(Field::new("x", FieldType::Int)).unwrap();
        a.add_field(Field::new("y", FieldType::Int)).unwrap();
        a.add_key(Unique::new(vec!["x".to_string(), "y".to_string()])).unwrap();
        a.add_field(mref("bs", "B", "AB", "A", "B")).unwrap();
        model.add_entity(a).unwrap();
        model.add_entity(entity("B")).unwrap();

        synthesize_link_tables(&mut model, Dialect::Generic).unwrap();
        let join = model.entity("AB").unwrap();
        assert!(join.has_field("A_x"));
        assert!(join.has_field("A_y"));
        assert_eq!(join.keys[1].fields.len(), 3);
    }

    #[test]
    fn test_bidirectional_reuses_join_entity() {
        let mut model = Model::new("m");
        let mut a = entity("A");
        a.add_field(mref("bs", "B", "AB", "A", "B")).unwrap();
        model.add_entity(a).unwrap();
        let mut b = entity("B");
        let mut back = mref("as", "A", "AB", "x", "y");
        back.xref_mut().unwrap().labels = vec!["id".to_string(), "name".to_string()];
        b.add_field(back).unwrap();
        model.add_entity(b).unwrap();

        let created = synthesize_link_tables(&mut model, Dialect::Generic).unwrap();
        assert_eq!(created.len(), 1);
        let join = model.entity("AB").unwrap();
        assert_eq!(
            join.field("A").unwrap().xref().unwrap().labels,
            vec!["id".to_string(), "name".to_string()]
        );
        let link = model.entity("B").unwrap().field("as").unwrap().field_type.mref_link().unwrap();
        assert_eq!(link.local_id.as_deref(), Some("B"));
        assert_eq!(link.remote_id.as_deref(), Some("A"));
    }

    #[test]
    fn test_declared_join_entity_reused() {
        let mut model = Model::new("m");
        let mut a = entity("A");
        a.add_field(mref("bs", "B", "AB", "A", "B")).unwrap();
        model.add_entity(a).unwrap();
        model.add_entity(entity("B")).unwrap();
        let mut ab = entity("AB");
        ab.add_field(Field::new("a", FieldType::Xref(XrefTarget::new("A")))).unwrap();
        ab.add_field(Field::new("b", FieldType::Xref(XrefTarget::new("B")))).unwrap();
        model.add_entity(ab).unwrap();

        let created = synthesize_link_tables(&mut model, Dialect::Generic).unwrap();
        assert!(created.is_empty());
        let link = model.entity("A").unwrap().field("bs").unwrap().field_type.mref_link().unwrap();
        assert_eq!(link.local_id.as_deref(), Some("a"));
        assert_eq!(link.remote_id.as_deref(), Some("b"));
        assert_eq!(
            model.entity("AB").unwrap().field("b").unwrap().xref().unwrap().labels,
            vec!["id".to_string()]
        );
    }

    #[test]
    fn test_declared_join_entity_without_target_column() {
        let mut model = Model::new("m");
        let mut a = entity("A");
        a.add_field(mref("bs", "B", "AB", "A", "B")).unwrap();
        model.add_entity(a).unwrap();
        model.add_entity(entity("B")).unwrap();
        let mut ab = entity("AB");
        ab.add_field(Field::new("a", FieldType::Xref(XrefTarget::new("A")))).unwrap();
        model.add_entity(ab).unwrap();

        let err = synthesize_link_tables(&mut model, Dialect::Generic).unwrap_err();
        assert!(matches!(err, ModelError::Reference(_)));
    }

    #[test]
    fn test_self_reference_has_two_columns() {
        let mut model = Model::new("m");
        let mut person = entity("Person");
        person
            .add_field(mref("friends", "Person", "Person_friends", "Person_self", "Person"))
            .unwrap();
        model.add_entity(person).unwrap();

        synthesize_link_tables(&mut model, Dialect::Generic).unwrap();
        let join = model.entity("Person_friends").unwrap();
        assert_eq!(join.field("Person_self").unwrap().xref_entity(), Some("Person"));
        assert_eq!(join.field("Person").unwrap().xref_entity(), Some("Person"));
    }
}
