//! View checks
//!
//! View entities must exist. The reference fields joining consecutive view
//! entities are recorded as join pairs for generators; a view without any
//! join pair is accepted.

use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::models::Model;

/// Reference fields of `from` that point at `to`, as `from.field`
fn joins(model: &Model, from: &str, to: &str) -> Vec<String> {
    model
        .all_fields(from)
        .into_iter()
        .filter(|f| f.xref_entity() == Some(to))
        .map(|f| format!("{}.{}", from, f.name))
        .collect()
}

pub fn validate_views(model: &mut Model) -> ModelResult<()> {
    let mut computed = Vec::new();
    for (i, view) in model.views.iter().enumerate() {
        for entity in &view.entities {
            if !model.has_entity(entity) {
                return Err(ModelError::reference(format!(
                    "view '{}' refers to unknown entity '{}'",
                    view.name, entity
                )));
            }
        }

        let mut pairs = Vec::new();
        for (a, b) in view.entities.iter().zip(view.entities.iter().skip(1)) {
            pairs.extend(joins(model, a, b).into_iter().map(|field| (field, b.clone())));
            pairs.extend(joins(model, b, a).into_iter().map(|field| (field, a.clone())));
        }
        debug!(view = %view.name, pairs = pairs.len(), "computed view join pairs");
        computed.push((i, pairs));
    }
    for (i, pairs) in computed {
        model.views[i].join_pairs = pairs;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, Field, FieldType, View, XrefTarget};

    fn model() -> Model {
        let mut model = Model::new("m");
        model.add_entity(Entity::new("Person")).unwrap();
        let mut pet = Entity::new("Pet");
        pet.add_field(Field::new("owner", FieldType::Xref(XrefTarget::new("Person"))))
            .unwrap();
        model.add_entity(pet).unwrap();
        model
    }

    fn view(entities: &[&str]) -> View {
        View {
            name: "v".to_string(),
            label: "v".to_string(),
            entities: entities.iter().map(|e| e.to_string()).collect(),
            join_pairs: Vec::new(),
        }
    }

    #[test]
    fn test_join_pairs() {
        let mut model = model();
        model.views.push(view(&["Person", "Pet"]));
        validate_views(&mut model).unwrap();
        assert_eq!(
            model.views[0].join_pairs,
            vec![("Pet.owner".to_string(), "Person".to_string())]
        );
    }

    #[test]
    fn test_unknown_entity() {
        let mut model = model();
        model.views.push(view(&["Person", "Car"]));
        assert!(matches!(validate_views(&mut model), Err(ModelError::Reference(_))));
    }

    #[test]
    fn test_unrelated_entities_accepted() {
        let mut model = model();
        model.add_entity(Entity::new("Car")).unwrap();
        model.views.push(view(&["Person", "Car"]));
        validate_views(&mut model).unwrap();
        assert!(model.views[0].join_pairs.is_empty());
    }
}
