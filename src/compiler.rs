//! Compiler facade
//!
//! Parses one or more db-schema documents and an optional ui-schema document,
//! runs the validation passes and orders the entities by dependency.
//!
//! ```ignore
//! let compiled = ModelCompiler::new(CompilerOptions::default())
//!     .compile(&[schema_xml], Some(ui_xml))?;
//! for name in &compiled.entity_order {
//!     println!("{}", name);
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::CompilerOptions;
use crate::error::{ModelError, ModelResult, StructuralWarning};
use crate::import::{IncludeResolver, NoIncludes, SchemaParser, UiParser};
use crate::models::{Entity, Model};
use crate::validation::{self, DependencyOrderer, validate_ui};

/// Name of the abstract entity authorizable entities implement, when declared
pub const AUTHORIZABLE: &str = "Authorizable";

/// Output of a successful compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledModel {
    pub model: Model,
    /// Entity names, referenced entities first
    pub entity_order: Vec<String>,
    pub warnings: Vec<StructuralWarning>,
}

impl CompiledModel {
    /// Entities in dependency order
    pub fn ordered_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entity_order
            .iter()
            .filter_map(|name| self.model.entity(name))
    }
}

/// Compiles schema documents into a [`CompiledModel`]
pub struct ModelCompiler {
    options: CompilerOptions,
    resolver: Box<dyn IncludeResolver>,
}

impl ModelCompiler {
    /// Create a compiler that rejects ui-schema includes
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            resolver: Box::new(NoIncludes),
        }
    }

    /// Use `resolver` to load documents named by ui-schema `include` elements
    pub fn with_include_resolver(mut self, resolver: impl IncludeResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile the documents. The first fatal problem aborts and is returned.
    pub fn compile(&self, db_schemas: &[&str], ui_schema: Option<&str>) -> ModelResult<CompiledModel> {
        self.run(db_schemas, ui_schema).inspect_err(|e| {
            error!(kind = ?e.kind(), "compilation failed: {}", e);
        })
    }

    fn run(&self, db_schemas: &[&str], ui_schema: Option<&str>) -> ModelResult<CompiledModel> {
        let mut parser = SchemaParser::new();
        let mut model = Model::default();
        for (i, content) in db_schemas.iter().enumerate() {
            info!(document = i + 1, of = db_schemas.len(), "parsing db-schema");
            parser.parse_into(&mut model, content)?;
        }
        let mut warnings = std::mem::take(&mut parser.warnings);

        self.tag_authorizable(&mut model)?;
        warnings.extend(validation::validate(&mut model, &self.options)?);

        if let Some(content) = ui_schema {
            info!("parsing ui-schema");
            let mut ui_parser = UiParser::new().with_dialect(self.options.dialect);
            ui_parser.parse_into(&mut model, content, self.resolver.as_ref())?;
            warnings.append(&mut ui_parser.warnings);
            warnings.extend(validate_ui(&model)?);
        }

        let order = DependencyOrderer::new(&model).order();
        warnings.extend(order.cycle_warning);
        info!(
            model = %model.name,
            entities = order.order.len(),
            warnings = warnings.len(),
            "compiled model"
        );

        Ok(CompiledModel {
            model,
            entity_order: order.order,
            warnings,
        })
    }

    fn tag_authorizable(&self, model: &mut Model) -> ModelResult<()> {
        let has_interface = model
            .entity(AUTHORIZABLE)
            .is_some_and(|e| e.is_abstract);
        for name in &self.options.authorizable {
            let entity = model.entity_mut(name).ok_or_else(|| {
                ModelError::reference(format!(
                    "authorizable entity '{}' does not exist",
                    name
                ))
            })?;
            entity.authorizable = true;
            if has_interface
                && entity.name != AUTHORIZABLE
                && !entity.implements.iter().any(|i| i == AUTHORIZABLE)
            {
                entity.implements.push(AUTHORIZABLE.to_string());
            }
        }
        Ok(())
    }
}

impl Default for ModelCompiler {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}
