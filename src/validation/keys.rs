//! Key validation and default entity labels

use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::models::{FieldType, Model};

/// Check key fields, auto-increment fields and enum defaults
pub fn validate_keys(model: &Model) -> ModelResult<()> {
    for entity in &model.entities {
        let fields = model.all_fields(&entity.name);
        let keys = model.all_keys(&entity.name);

        for key in &entity.keys {
            for name in &key.fields {
                if !fields.iter().any(|f| &f.name == name) {
                    return Err(ModelError::reference(format!(
                        "key field '{}' of entity '{}' does not exist",
                        name, entity.name
                    )));
                }
            }
        }

        for field in entity.fields.iter().filter(|f| f.is_auto_id()) {
            if !keys.iter().any(|k| k.fields.contains(&field.name)) {
                return Err(ModelError::constraint(format!(
                    "auto field '{}.{}' must be part of a unique key",
                    entity.name, field.name
                )));
            }
        }

        if !entity.is_abstract {
            let auto_fields: Vec<&str> = fields
                .iter()
                .filter(|f| f.is_auto_id())
                .map(|f| f.name.as_str())
                .collect();
            if auto_fields.len() != 1 {
                return Err(ModelError::constraint(format!(
                    "entity '{}' must have exactly one auto-increment field, found {} ({})",
                    entity.name,
                    auto_fields.len(),
                    auto_fields.join(", ")
                )));
            }
        }

        for field in &entity.fields {
            if let FieldType::Enum { options } = &field.field_type {
                if !field.default_value.is_empty() && !options.contains(&field.default_value) {
                    return Err(ModelError::type_error(format!(
                        "default '{}' of enum field '{}.{}' is not one of its options [{}]",
                        field.default_value,
                        entity.name,
                        field.name,
                        options.join(",")
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Require a primary key on concrete entities and give every entity display
/// labels: the declared `xref_label`, else the second key, else the first
pub fn assign_default_labels(model: &mut Model) -> ModelResult<()> {
    let mut assigned = Vec::new();
    for entity in &model.entities {
        let keys = model.all_keys(&entity.name);
        if keys.is_empty() {
            if entity.is_abstract {
                continue;
            }
            return Err(ModelError::constraint(format!(
                "entity '{}' has no primary key; add an autoid field or a unique",
                entity.name
            )));
        }
        match &entity.xref_labels {
            Some(labels) => {
                for label in labels {
                    if model.all_field(&entity.name, label).is_none() {
                        return Err(ModelError::reference(format!(
                            "xref_label '{}' of entity '{}' is not one of its fields",
                            label, entity.name
                        )));
                    }
                }
            }
            None => {
                let key = keys.get(1).unwrap_or(&keys[0]);
                assigned.push((entity.name.clone(), key.fields.clone()));
            }
        }
    }
    for (name, labels) in assigned {
        debug!(entity = %name, labels = ?labels, "default xref labels");
        if let Some(entity) = model.entity_mut(&name) {
            entity.xref_labels = Some(labels);
        }
    }
    Ok(())
}
