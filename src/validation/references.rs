//! Reference resolution
//!
//! Makes every xref/mref concrete: the target entity must exist and be
//! concrete, `xref_field` defaults to the target's primary key and must be a
//! unique column, and every display label must name a field the target can
//! show.

use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::models::{Entity, Field, FieldOrigin, FieldType, Model, XrefTarget};

fn field_names(fields: &[&Field]) -> String {
    fields
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Labels that can be shown for `entity`: the fields of all its keys, with
/// reference fields expanded one level as `<field>_<label>`
pub fn candidate_labels(model: &Model, entity: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for key in model.all_keys(entity) {
        for name in &key.fields {
            let Some(field) = model.all_field(entity, name) else {
                continue;
            };
            let expanded: Vec<String> = match field.xref() {
                Some(target) if !target.labels.is_empty() => target
                    .labels
                    .iter()
                    .map(|label| format!("{}_{}", name, label.replace('.', "_")))
                    .collect(),
                Some(target) => vec![format!(
                    "{}_{}",
                    name,
                    target.field.as_deref().unwrap_or_default()
                )],
                None => vec![name.clone()],
            };
            for candidate in expanded {
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates
}

fn resolve_target_entity<'a>(model: &'a Model, context: &str, name: &str) -> ModelResult<&'a Entity> {
    if let Some(entity) = model.entity(name) {
        return Ok(entity);
    }
    match model.entity_ignore_case(name) {
        Some(other) => Err(ModelError::reference(format!(
            "xref_entity '{}' of {} does not exist; entity names are case-sensitive, did you mean '{}'?",
            name, context, other.name
        ))),
        None => Err(ModelError::reference(format!(
            "xref_entity '{}' of {} does not exist",
            name, context
        ))),
    }
}

fn resolve_label(
    model: &Model,
    context: &str,
    target: &Entity,
    xref_field: &str,
    label: &str,
) -> ModelResult<String> {
    if label.contains('.') {
        let (entity, field) = model.find_field(label).ok_or_else(|| {
            ModelError::reference(format!(
                "xref_label '{}' of {} does not exist in the model",
                label, context
            ))
        })?;
        return Ok(format!("{}.{}", entity.name, field.name));
    }
    if label == xref_field {
        return Ok(label.to_string());
    }
    if let Some(field) = model.all_field_ignore_case(&target.name, label) {
        return Ok(field.name.clone());
    }

    let candidates = candidate_labels(model, &target.name);
    if candidates.iter().any(|c| c == label) {
        return Ok(label.to_string());
    }
    if candidates.is_empty() {
        return Err(ModelError::reference(format!(
            "xref_label '{}' of {} is not a field of '{}' and '{}' has no unique fields to use. Did you set unique=true?",
            label, context, target.name, target.name
        )));
    }
    let lowered = label.to_lowercase();
    let matches: Vec<&String> = candidates
        .iter()
        .filter(|c| {
            let c = c.to_lowercase();
            c == lowered || c.ends_with(&format!("_{}", lowered))
        })
        .collect();
    match matches.as_slice() {
        [single] => {
            debug!(field = %context, label = %label, candidate = %single, "matched label candidate");
            Ok((*single).clone())
        }
        _ => Err(ModelError::reference(format!(
            "xref_label '{}' of {} is not a field of '{}'; valid labels are: {}",
            label,
            context,
            target.name,
            candidates.join(", ")
        ))),
    }
}

/// Resolve one reference field of `owner`
fn resolve_field(model: &Model, owner: &Entity, field: &Field) -> ModelResult<XrefTarget> {
    let context = format!("{}.{}", owner.name, field.name);
    let Some(declared) = field.xref() else {
        return Err(ModelError::type_error(format!("{} is not a reference", context)));
    };

    if owner.is_abstract && field.field_type.is_mref() {
        return Err(ModelError::constraint(format!(
            "interface '{}' cannot own mref field '{}'; move it to the implementing entities",
            owner.name, field.name
        )));
    }

    let target = resolve_target_entity(model, &context, &declared.entity)?;
    if target.is_abstract && field.origin != FieldOrigin::InheritedKey {
        return Err(ModelError::reference(format!(
            "{} refers to '{}', which is abstract and has no table",
            context, target.name
        )));
    }

    let xref_field = match &declared.field {
        Some(name) => name.clone(),
        None => {
            let key = model.primary_key(&target.name).ok_or_else(|| {
                ModelError::reference(format!(
                    "{} refers to '{}', which has no primary key",
                    context, target.name
                ))
            })?;
            match key.fields.as_slice() {
                [single] => single.clone(),
                _ => {
                    return Err(ModelError::reference(format!(
                        "{} refers to '{}', whose primary key ({}) has more than one field; set xref_field",
                        context,
                        target.name,
                        key.fields.join(",")
                    )));
                }
            }
        }
    };

    let target_fields = model.all_fields(&target.name);
    let target_field = model
        .all_field_ignore_case(&target.name, &xref_field)
        .ok_or_else(|| {
            ModelError::reference(format!(
                "xref_field '{}' of {} does not exist in '{}' (fields: {})",
                xref_field,
                context,
                target.name,
                field_names(&target_fields)
            ))
        })?;
    let is_unique = model
        .all_keys(&target.name)
        .iter()
        .any(|k| k.fields.contains(&target_field.name));
    if !is_unique {
        return Err(ModelError::reference(format!(
            "foreign key {} refers to '{}.{}', which is not unique (fields: {})",
            context,
            target.name,
            target_field.name,
            field_names(&target_fields)
        )));
    }
    if matches!(target_field.field_type, FieldType::Text) {
        return Err(ModelError::reference(format!(
            "foreign key {} refers to '{}.{}', which is of type text",
            context, target.name, target_field.name
        )));
    }

    let labels = if declared.labels.is_empty() {
        vec![target_field.name.clone()]
    } else {
        declared
            .labels
            .iter()
            .map(|label| resolve_label(model, &context, target, &target_field.name, label))
            .collect::<ModelResult<Vec<_>>>()?
    };

    Ok(XrefTarget {
        entity: target.name.clone(),
        field: Some(target_field.name.clone()),
        labels,
        cascade: declared.cascade,
    })
}

/// Resolve the reference fields of the named entities
pub fn resolve_entities(model: &mut Model, names: &[String]) -> ModelResult<()> {
    for name in names {
        let Some(owner) = model.entity(name) else {
            continue;
        };
        let mut resolved = Vec::new();
        for (i, field) in owner.fields.iter().enumerate() {
            if field.field_type.is_reference() {
                resolved.push((i, resolve_field(model, owner, field)?));
            }
        }
        if let Some(owner) = model.entity_mut(name) {
            for (i, target) in resolved {
                if let Some(slot) = owner.fields[i].xref_mut() {
                    *slot = target;
                }
            }
        }
    }
    Ok(())
}

/// Resolve every reference field of the model
pub fn resolve_references(model: &mut Model) -> ModelResult<()> {
    let names = model.entity_names();
    resolve_entities(model, &names)
}

/// Replace labels that start with the referenced field with the target
/// entity's display labels
pub fn propagate_default_labels(model: &mut Model) {
    let mut updates = Vec::new();
    for (ei, entity) in model.entities.iter().enumerate() {
        for (fi, field) in entity.fields.iter().enumerate() {
            let Some(target) = field.xref() else {
                continue;
            };
            let Some(xref_field) = target.field.as_deref() else {
                continue;
            };
            if target.labels.first().map(String::as_str) != Some(xref_field) {
                continue;
            }
            let Some(labels) = model.entity(&target.entity).and_then(|e| e.xref_labels.clone()) else {
                continue;
            };
            if labels != target.labels {
                updates.push((ei, fi, labels));
            }
        }
    }
    for (ei, fi, labels) in updates {
        let entity = &mut model.entities[ei];
        debug!(entity = %entity.name, field = %entity.fields[fi].name, labels = ?labels, "default labels");
        if let Some(target) = entity.fields[fi].xref_mut() {
            target.labels = labels;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MrefLink, Unique};

    fn person() -> Entity {
        let mut e = Entity::new("Person");
        e.add_field(Field::auto_id("id")).unwrap();
        e.add_field(Field::new("name", FieldType::String { length: 255 }))
            .unwrap();
        e.add_field(Field::new("bio", FieldType::Text)).unwrap();
        e.add_key(Unique::new(vec!["id".to_string()])).unwrap();
        e.add_key(Unique::new(vec!["name".to_string()])).unwrap();
        e.xref_labels = Some(vec!["name".to_string()]);
        e
    }

    fn pet(target: XrefTarget) -> Entity {
        let mut e = Entity::new("Pet");
        e.add_field(Field::auto_id("id")).unwrap();
        e.add_field(Field::new("owner", FieldType::Xref(target))).unwrap();
        e.add_key(Unique::new(vec!["id".to_string()])).unwrap();
        e
    }

    fn pet_model(target: XrefTarget) -> Model {
        let mut model = Model::new("m");
        model.add_entity(person()).unwrap();
        model.add_entity(pet(target)).unwrap();
        model
    }

    fn owner(model: &Model) -> XrefTarget {
        model
            .entity("Pet")
            .unwrap()
            .field("owner")
            .unwrap()
            .xref()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_default_xref_field_and_labels() {
        let mut model = pet_model(XrefTarget::new("Person"));
        resolve_references(&mut model).unwrap();
        let target = owner(&model);
        assert_eq!(target.field.as_deref(), Some("id"));
        assert_eq!(target.labels, vec!["id".to_string()]);

        propagate_default_labels(&mut model);
        assert_eq!(owner(&model).labels, vec!["name".to_string()]);
    }

    #[test]
    fn test_default_labels_replace_leading_key() {
        let mut target = XrefTarget::new("Person");
        target.labels = vec!["id".to_string(), "bio".to_string()];
        let mut model = pet_model(target);
        resolve_references(&mut model).unwrap();
        propagate_default_labels(&mut model);
        assert_eq!(owner(&model).labels, vec!["name".to_string()]);

        let mut target = XrefTarget::new("Person");
        target.labels = vec!["bio".to_string(), "id".to_string()];
        let mut model = pet_model(target);
        resolve_references(&mut model).unwrap();
        propagate_default_labels(&mut model);
        assert_eq!(owner(&model).labels, vec!["bio".to_string(), "id".to_string()]);
    }

    #[test]
    fn test_missing_and_miscased_target() {
        let mut model = pet_model(XrefTarget::new("Tag"));
        let err = resolve_references(&mut model).unwrap_err();
        assert!(matches!(err, ModelError::Reference(_)));
        assert!(err.to_string().contains("'Tag'"));

        let mut model = model_case();
        let err = resolve_references(&mut model).unwrap_err();
        assert!(err.to_string().contains("case-sensitive"));
    }

    fn model_case() -> Model {
        pet_model(XrefTarget::new("person"))
    }

    #[test]
    fn test_target_field_must_be_unique() {
        let mut target = XrefTarget::new("Person");
        target.field = Some("bio".to_string());
        let mut model = pet_model(target);
        let err = resolve_references(&mut model).unwrap_err();
        assert!(err.to_string().contains("not unique"));
        assert!(err.to_string().contains("id, name, bio"));
    }

    #[test]
    fn test_text_target_rejected() {
        let mut target = XrefTarget::new("Person");
        target.field = Some("bio".to_string());
        let mut model = pet_model(target);
        model
            .entity_mut("Person")
            .unwrap()
            .add_key(Unique::new(vec!["bio".to_string()]))
            .unwrap();
        let err = resolve_references(&mut model).unwrap_err();
        assert!(err.to_string().contains("text"));
    }

    #[test]
    fn test_abstract_target_rejected() {
        let mut model = pet_model(XrefTarget::new("Person"));
        model.entity_mut("Person").unwrap().is_abstract = true;
        assert!(matches!(resolve_references(&mut model), Err(ModelError::Reference(_))));
    }

    #[test]
    fn test_abstract_owner_with_mref() {
        let mut model = pet_model(XrefTarget::new("Person"));
        let mut interface = Entity::new("Taggable");
        interface.is_abstract = true;
        interface
            .add_field(Field::new(
                "tags",
                FieldType::Mref {
                    target: XrefTarget::new("Person"),
                    link: MrefLink::default(),
                },
            ))
            .unwrap();
        model.add_entity(interface).unwrap();
        assert!(matches!(resolve_references(&mut model), Err(ModelError::Constraint(_))));
    }

    #[test]
    fn test_labels() {
        let mut target = XrefTarget::new("Person");
        target.labels = vec!["NAME".to_string(), "Person.bio".to_string()];
        let mut model = pet_model(target);
        resolve_references(&mut model).unwrap();
        assert_eq!(
            owner(&model).labels,
            vec!["name".to_string(), "Person.bio".to_string()]
        );

        let mut target = XrefTarget::new("Person");
        target.labels = vec!["nickname".to_string()];
        let mut model = pet_model(target);
        let err = resolve_references(&mut model).unwrap_err();
        assert!(err.to_string().contains("valid labels are: id, name"));
    }

    #[test]
    fn test_expanded_candidate_labels() {
        let mut model = pet_model(XrefTarget::new("Person"));
        let pet = model.entity_mut("Pet").unwrap();
        pet.add_key(Unique::new(vec!["owner".to_string()])).unwrap();
        pet.field_mut("owner").unwrap().xref_mut().unwrap().labels = vec!["name".to_string()];

        let candidates = candidate_labels(&model, "Pet");
        assert_eq!(candidates, vec!["id".to_string(), "owner_name".to_string()]);

        let mut visit = Entity::new("Visit");
        visit.add_field(Field::auto_id("id")).unwrap();
        visit.add_key(Unique::new(vec!["id".to_string()])).unwrap();
        let mut target = XrefTarget::new("Pet");
        target.labels = vec!["owner_name".to_string()];
        visit.add_field(Field::new("pet", FieldType::Xref(target))).unwrap();
        model.add_entity(visit).unwrap();
        resolve_references(&mut model).unwrap();
        let labels = &model.entity("Visit").unwrap().field("pet").unwrap().xref().unwrap().labels;
        assert_eq!(labels, &vec!["owner_name".to_string()]);
    }

    fn visit(labels: &[&str]) -> Entity {
        let mut visit = Entity::new("Visit");
        visit.add_field(Field::auto_id("id")).unwrap();
        visit.add_key(Unique::new(vec!["id".to_string()])).unwrap();
        let mut target = XrefTarget::new("Pet");
        target.labels = labels.iter().map(|l| l.to_string()).collect();
        visit.add_field(Field::new("pet", FieldType::Xref(target))).unwrap();
        visit
    }

    #[test]
    fn test_label_suffix_selects_single_candidate() {
        let mut model = pet_model(XrefTarget::new("Person"));
        let pet = model.entity_mut("Pet").unwrap();
        pet.add_key(Unique::new(vec!["owner".to_string()])).unwrap();
        pet.field_mut("owner").unwrap().xref_mut().unwrap().labels = vec!["name".to_string()];
        model.add_entity(visit(&["Name"])).unwrap();

        resolve_references(&mut model).unwrap();
        let labels = &model.entity("Visit").unwrap().field("pet").unwrap().xref().unwrap().labels;
        assert_eq!(labels, &vec!["owner_name".to_string()]);
    }

    #[test]
    fn test_label_suffix_ambiguous() {
        let mut model = pet_model(XrefTarget::new("Person"));
        let mut vet = Entity::new("Vet");
        vet.add_field(Field::auto_id("id")).unwrap();
        vet.add_field(Field::new("name", FieldType::String { length: 255 }))
            .unwrap();
        vet.add_key(Unique::new(vec!["id".to_string()])).unwrap();
        vet.add_key(Unique::new(vec!["name".to_string()])).unwrap();
        model.add_entity(vet).unwrap();

        let pet = model.entity_mut("Pet").unwrap();
        let mut doctor = XrefTarget::new("Vet");
        doctor.labels = vec!["name".to_string()];
        pet.add_field(Field::new("doctor", FieldType::Xref(doctor))).unwrap();
        pet.field_mut("owner").unwrap().xref_mut().unwrap().labels = vec!["name".to_string()];
        pet.add_key(Unique::new(vec!["owner".to_string(), "doctor".to_string()]))
            .unwrap();
        model.add_entity(visit(&["name"])).unwrap();

        assert_eq!(
            candidate_labels(&model, "Pet"),
            vec!["id".to_string(), "owner_name".to_string(), "doctor_name".to_string()]
        );
        let err = resolve_references(&mut model).unwrap_err();
        assert!(matches!(err, ModelError::Reference(_)));
        assert!(err.to_string().contains("valid labels are: id, owner_name, doctor_name"));
    }

    #[test]
    fn test_no_candidates_hint() {
        let mut model = Model::new("m");
        let mut tag = Entity::new("Tag");
        tag.add_field(Field::new("code", FieldType::Int)).unwrap();
        model.add_entity(tag).unwrap();
        let mut note = Entity::new("Note");
        let mut target = XrefTarget::new("Tag");
        target.field = Some("code".to_string());
        target.labels = vec!["title".to_string()];
        note.add_field(Field::new("tag", FieldType::Xref(target))).unwrap();
        model.add_entity(note).unwrap();
        // not unique, so the key check fires first
        assert!(resolve_references(&mut model).is_err());

        let candidates = candidate_labels(&model, "Tag");
        assert!(candidates.is_empty());
    }
}
