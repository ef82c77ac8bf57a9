//! Output formatting for CLI

use clap::ValueEnum;

use crate::cli::error::CliError;
use crate::compiler::CompiledModel;
use crate::models::{Entity, Field, FieldType};

/// How a compiled model is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per entity
    #[default]
    Compact,
    /// Entities with their fields and keys
    Pretty,
    /// The full compiled model as JSON
    Json,
}

fn type_label(field: &Field) -> String {
    match &field.field_type {
        FieldType::String { length } => format!("string({})", length),
        FieldType::Enum { options } => format!("enum[{}]", options.join("|")),
        FieldType::Xref(target) => format!(
            "xref->{}.{}",
            target.entity,
            target.field.as_deref().unwrap_or("?")
        ),
        FieldType::Mref { target, link } => format!(
            "mref->{} via {}",
            target.entity,
            link.name.as_deref().unwrap_or("?")
        ),
        other => other.name().to_string(),
    }
}

fn entity_flags(entity: &Entity) -> String {
    let mut flags = Vec::new();
    if entity.is_abstract {
        flags.push("abstract");
    }
    if entity.association {
        flags.push("link");
    }
    if entity.authorizable {
        flags.push("authorizable");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    }
}

fn format_warnings(result: &CompiledModel, output: &mut String) {
    if result.warnings.is_empty() {
        return;
    }
    output.push_str(&format!("\n⚠️  {} warning(s):\n", result.warnings.len()));
    for warning in &result.warnings {
        output.push_str(&format!("  - [{:?}] {}\n", warning.kind, warning.message));
    }
}

/// Format a compiled model in compact mode
pub fn format_compact_output(result: &CompiledModel) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n✅ Compiled model '{}' with {} entit(y/ies):\n",
        result.model.name,
        result.entity_order.len()
    ));
    for (idx, entity) in result.ordered_entities().enumerate() {
        let fields: Vec<String> = entity
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.field_type.name()))
            .collect();
        output.push_str(&format!(
            "  {}. {}{} [{}]\n",
            idx + 1,
            entity.name,
            entity_flags(entity),
            fields.join(", ")
        ));
    }
    format_warnings(result, &mut output);
    output
}

/// Format a compiled model in pretty mode
pub fn format_pretty_output(result: &CompiledModel) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n✅ Compiled model '{}' with {} entit(y/ies):\n",
        result.model.name,
        result.entity_order.len()
    ));
    for (idx, entity) in result.ordered_entities().enumerate() {
        output.push_str(&format!("\nEntity {}: {}{}\n", idx + 1, entity.name, entity_flags(entity)));
        if !entity.parents.is_empty() {
            output.push_str(&format!("  Extends: {}\n", entity.parents.join(", ")));
        }
        if !entity.implements.is_empty() {
            output.push_str(&format!("  Implements: {}\n", entity.implements.join(", ")));
        }
        output.push_str(&format!("  Fields: {}\n", entity.fields.len()));
        for field in &entity.fields {
            let mut marks = Vec::new();
            if field.auto {
                marks.push("auto");
            }
            if field.nillable {
                marks.push("nillable");
            }
            if field.hidden {
                marks.push("hidden");
            }
            output.push_str(&format!(
                "    - {}: {}{}\n",
                field.name,
                type_label(field),
                if marks.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", marks.join(", "))
                }
            ));
        }
        for key in &entity.keys {
            output.push_str(&format!("  Unique: ({})\n", key.fields.join(", ")));
        }
    }
    format_warnings(result, &mut output);
    output
}

/// Format a compiled model as JSON
pub fn format_json_output(result: &CompiledModel) -> Result<String, CliError> {
    serde_json::to_string_pretty(result)
        .map(|json| json + "\n")
        .map_err(|e| CliError::InvalidArgument(format!("Failed to serialize model: {}", e)))
}

pub fn format_output(result: &CompiledModel, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Compact => Ok(format_compact_output(result)),
        OutputFormat::Pretty => Ok(format_pretty_output(result)),
        OutputFormat::Json => format_json_output(result),
    }
}
