//! Validation and completion of a parsed model
//!
//! Provides the compilation passes run after the db-schema documents are
//! parsed:
//! - Name checks (reserved words, whitespace, identifier lengths)
//! - Inheritance (key propagation, discriminators, interface roots)
//! - Keys and default display labels
//! - Reference resolution and join entities for mrefs
//! - Views, user interface and dependency ordering

pub mod dialect;
pub mod inheritance;
pub mod keys;
pub mod link_tables;
pub mod names;
pub mod references;
pub mod relationships;
pub mod ui;
pub mod views;

pub use relationships::{DependencyOrder, DependencyOrderer};
pub use ui::validate_ui;

use tracing::{debug, info};

use crate::config::{CompilerOptions, MappingStrategy};
use crate::error::{ModelResult, StructuralWarning};
use crate::models::Model;

/// Run the entity passes in order. The model is modified in place; the first
/// error aborts, warnings are returned.
pub fn validate(model: &mut Model, options: &CompilerOptions) -> ModelResult<Vec<StructuralWarning>> {
    let dialect = options.dialect;
    let mut warnings = Vec::new();
    info!(model = %model.name, %dialect, entities = model.entities.len(), "validating model");

    names::validate_names(model, dialect)?;
    names::assign_link_names(model, dialect)?;
    debug!("names checked");

    inheritance::propagate_keys(model)?;
    if options.mapping == MappingStrategy::SubclassPerTable {
        warnings.extend(inheritance::add_discriminators(model)?);
    }
    inheritance::check_overrides(model)?;
    keys::validate_keys(model)?;
    keys::assign_default_labels(model)?;
    inheritance::relocate_interface_mrefs(model, dialect)?;
    debug!("keys checked");

    references::resolve_references(model)?;
    names::correct_field_case(model)?;
    references::resolve_references(model)?;
    views::validate_views(model)?;
    debug!("references resolved");

    let created = link_tables::synthesize_link_tables(model, dialect)?;
    references::resolve_entities(model, &created)?;
    debug!(link_tables = created.len(), "join entities created");

    references::propagate_default_labels(model);
    inheritance::propagate_decorators(model);
    if options.mapping == MappingStrategy::ClassPerTable {
        inheritance::add_interface_roots(model)?;
    }
    inheritance::copy_constraint_fields(model)?;
    names::validate_name_sizes(model, dialect)?;

    info!(model = %model.name, entities = model.entities.len(), warnings = warnings.len(), "model validated");
    Ok(warnings)
}
