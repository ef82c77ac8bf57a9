//! User interface checks

use super::names::contains_whitespace;
use crate::error::{ModelError, ModelResult, StructuralWarning, WarningKind};
use crate::models::{Model, UiKind};

/// Reject UI node names with whitespace and warn about forms that hide a
/// column users would have to fill in
pub fn validate_ui(model: &Model) -> ModelResult<Vec<StructuralWarning>> {
    let mut warnings = Vec::new();
    for node in model.ui.walk().into_iter().skip(1) {
        if contains_whitespace(&node.name) {
            return Err(ModelError::constraint(format!(
                "ui element name '{}' contains whitespace",
                node.name
            )));
        }
        let UiKind::Form(form) = &node.kind else {
            continue;
        };
        if form.readonly {
            continue;
        }
        for name in &form.hide_fields {
            let Some(field) = model.all_field_ignore_case(&form.entity, name) else {
                return Err(ModelError::reference(format!(
                    "form '{}' hides unknown field '{}' of entity '{}'",
                    node.name, name, form.entity
                )));
            };
            if !field.nillable && !field.auto && field.default_value.is_empty() {
                warnings.push(StructuralWarning::new(
                    WarningKind::HiddenField,
                    format!(
                        "form '{}' hides '{}.{}', which is required and has no default; records cannot be added",
                        node.name, form.entity, field.name
                    ),
                ));
            }
        }
    }
    Ok(warnings)
}
