//! db-schema importer
//!
//! Builds entities, fields, keys, indices, modules, views and methods from a
//! db-schema document. Every element has a fixed attribute whitelist; an
//! attribute outside it, a missing required attribute or an unknown type
//! aborts the import with an error naming the element and its entity.

use tracing::debug;

use super::document::{XmlElement, parse_document};
use super::types::{TypeName, known_type_names, resolve_type};
use crate::error::{ModelError, ModelResult, StructuralWarning, WarningKind};
use crate::models::{
    DEFAULT_STRING_LENGTH, Entity, Field, FieldFilter, FieldOrigin, FieldType, Index, Method,
    MethodQuery, Model, Module, MrefLink, Parameter, QueryRule, Unique, View, XrefTarget,
};

const ENTITY_ATTRIBUTES: &[&str] = &[
    "name",
    "label",
    "extends",
    "implements",
    "abstract",
    "description",
    "system",
    "decorator",
    "xref_label",
    "allocationSize",
];

const FIELD_ATTRIBUTES: &[&str] = &[
    "type",
    "name",
    "label",
    "auto",
    "nillable",
    "optional",
    "readonly",
    "default",
    "description",
    "desc",
    "unique",
    "hidden",
    "length",
    "index",
    "enum_options",
    "default_code",
    "xref",
    "xref_entity",
    "xref_field",
    "xref_label",
    "xref_name",
    "mref_name",
    "mref_localid",
    "mref_remoteid",
    "filter",
    "filtertype",
    "filterfield",
    "filterField",
    "filtervalue",
    "xref_cascade",
    "allocationSize",
    "jpaCascade",
];

const UNIQUE_ATTRIBUTES: &[&str] = &["fields", "subclass", "description"];
const MODULE_ATTRIBUTES: &[&str] = &["name", "label"];
const VIEW_ATTRIBUTES: &[&str] = &["name", "label", "entities"];
const METHOD_ATTRIBUTES: &[&str] = &["name", "description"];
const PARAMETER_ATTRIBUTES: &[&str] = &["name", "type", "label", "default"];
const RULE_ATTRIBUTES: &[&str] = &["field", "operator", "parameter"];

/// Split a comma separated attribute value, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// db-schema importer
///
/// Structural warnings found while reading are collected in `warnings`.
#[derive(Debug, Default)]
pub struct SchemaParser {
    pub warnings: Vec<StructuralWarning>,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Parse a single document into a new model
    pub fn parse(&mut self, content: &str) -> ModelResult<Model> {
        let mut model = Model::default();
        self.parse_into(&mut model, content)?;
        Ok(model)
    }

    /// Parse a document and add its declarations to `model`
    pub fn parse_into(&mut self, model: &mut Model, content: &str) -> ModelResult<()> {
        let root = parse_document(content)?;

        if let Some(name) = root.non_empty_attr("name") {
            model.name = name.trim().to_string();
            model.label = name.trim().to_string();
            model.ui.name = model.name.clone();
            model.ui.label = model.name.clone();
        }
        if let Some(label) = root.non_empty_attr("label") {
            model.label = label.to_string();
        }

        for element in &root.children {
            match element.name.as_str() {
                "entity" => {
                    let entity = self.parse_entity(model, element, None)?;
                    model.add_entity(entity)?;
                }
                "module" => self.parse_module(model, element)?,
                "view" => {
                    let view = self.parse_view(element)?;
                    model.views.push(view);
                }
                "method" => {
                    let method = self.parse_method(element)?;
                    if model.method(&method.name).is_some() {
                        return Err(ModelError::constraint(format!(
                            "duplicate method '{}'",
                            method.name
                        )));
                    }
                    model.methods.push(method);
                }
                "description" => append_description(&mut model.description, element),
                other => self.warn(
                    WarningKind::IgnoredElement,
                    format!("element <{}> is not supported and was skipped", other),
                ),
            }
        }
        debug!(
            model = %model.name,
            entities = model.entities.len(),
            "parsed db-schema document"
        );
        Ok(())
    }

    fn warn(&mut self, kind: WarningKind, message: String) {
        self.warnings.push(StructuralWarning::new(kind, message));
    }

    /// Parse an `<entity>` element. `model` holds the entities declared before
    /// it, which is where promoted key fields are looked up.
    pub fn parse_entity(
        &mut self,
        model: &Model,
        element: &XmlElement,
        module: Option<&str>,
    ) -> ModelResult<Entity> {
        let name = element
            .non_empty_attr("name")
            .ok_or_else(|| ModelError::syntax("name is missing for entity"))?
            .trim();
        element.check_attributes(ENTITY_ATTRIBUTES, &format!("in entity '{}'", name))?;

        let mut entity = Entity::new(name);
        entity.label = element.non_empty_attr("label").unwrap_or(name).to_string();
        entity.namespace = module.unwrap_or(model.name.as_str()).to_string();
        entity.module = module.map(String::from);
        entity.is_abstract = element.bool_attr("abstract");
        entity.system = element.bool_attr("system");
        entity.decorator = element.non_empty_attr("decorator").map(String::from);
        entity.parents = split_list(element.attr_or_empty("extends"));
        entity.implements = split_list(element.attr_or_empty("implements"));
        entity.xref_labels = element
            .non_empty_attr("xref_label")
            .map(split_list)
            .filter(|labels| !labels.is_empty());
        if let Some(size) = element.non_empty_attr("allocationSize") {
            entity.allocation_size = Some(size.trim().parse().map_err(|_| {
                ModelError::syntax(format!(
                    "allocationSize '{}' of entity '{}' is not a number",
                    size, name
                ))
            })?);
        }

        let mut description = element
            .non_empty_attr("description")
            .map(String::from)
            .unwrap_or_default();
        for child in element.children_named("description") {
            append_description(&mut description, child);
        }
        entity.description = Some(description).filter(|d| !d.is_empty());

        for child in element.children_named("field") {
            self.parse_field(&mut entity, child)?;
        }
        for child in element.children_named("unique") {
            parse_unique(model, &mut entity, child)?;
        }
        let indices: Vec<&XmlElement> = element.children_named("indices").collect();
        if indices.len() > 1 {
            return Err(ModelError::syntax(format!(
                "multiple <indices> elements in entity '{}'",
                name
            )));
        }
        if let Some(indices) = indices.first() {
            parse_indices(&mut entity, indices)?;
        }

        for child in &element.children {
            if !matches!(
                child.name.as_str(),
                "field" | "unique" | "indices" | "description"
            ) {
                self.warn(
                    WarningKind::IgnoredElement,
                    format!("element <{}> in entity '{}' was skipped", child.name, name),
                );
            }
        }

        debug!(entity = %entity.name, fields = entity.fields.len(), "parsed entity");
        Ok(entity)
    }

    /// Parse a `<field>` element and add it to `entity`, together with the key
    /// and index its `unique`/`index` attributes ask for
    pub fn parse_field(&mut self, entity: &mut Entity, element: &XmlElement) -> ModelResult<()> {
        let name = element
            .non_empty_attr("name")
            .ok_or_else(|| {
                ModelError::syntax(format!(
                    "name is missing for a field in entity '{}'",
                    entity.name
                ))
            })?
            .trim()
            .to_string();
        let context = format!("field '{}' of entity '{}'", name, entity.name);
        element.check_attributes(FIELD_ATTRIBUTES, &format!("on {}", context))?;

        let type_name = element
            .non_empty_attr("type")
            .ok_or_else(|| ModelError::syntax(format!("type is missing for {}", context)))?;
        let resolved = resolve_type(type_name).ok_or_else(|| {
            ModelError::type_error(format!(
                "type '{}' unknown for {} (known types: {})",
                type_name,
                context,
                known_type_names().join(", ")
            ))
        })?;

        let field_type = match resolved.name {
            TypeName::String => FieldType::String {
                length: parse_length(element, &context)?,
            },
            TypeName::Int => FieldType::Int,
            TypeName::Long => FieldType::Long,
            TypeName::Decimal => FieldType::Decimal,
            TypeName::Bool => FieldType::Bool,
            TypeName::Date => FieldType::Date,
            TypeName::DateTime => FieldType::DateTime,
            TypeName::Text => FieldType::Text,
            TypeName::File => FieldType::File,
            TypeName::Hyperlink => FieldType::Hyperlink,
            TypeName::Email => FieldType::Email,
            TypeName::Enum => FieldType::Enum {
                options: parse_enum_options(element, &context)?,
            },
            TypeName::Xref => FieldType::Xref(parse_xref_target(element, &context, false)?),
            TypeName::Mref => FieldType::Mref {
                target: parse_xref_target(element, &context, true)?,
                link: MrefLink {
                    name: trimmed(element, "mref_name"),
                    local_id: trimmed(element, "mref_localid"),
                    remote_id: trimmed(element, "mref_remoteid"),
                },
            },
        };

        let mut field = Field::new(name.clone(), field_type);
        field.label = element.non_empty_attr("label").unwrap_or(&name).to_string();
        field.nillable = if element.attr("nillable").is_some() {
            element.bool_attr("nillable")
        } else {
            element.bool_attr("optional")
        };
        field.auto = element.bool_attr("auto");
        field.readonly = element.bool_attr("readonly");
        field.hidden = element.bool_attr("hidden");
        field.default_value = element.attr_or_empty("default").to_string();
        field.default_code = element.non_empty_attr("default_code").map(String::from);
        field.description = element
            .non_empty_attr("description")
            .or_else(|| element.non_empty_attr("desc"))
            .map(String::from);
        let mut unique = element.bool_attr("unique");

        if resolved.auto_id {
            field.nillable = false;
            field.auto = true;
            field.readonly = true;
            field.default_value = String::new();
            unique = true;
        }

        if element.bool_attr("filter") {
            let filter_type = element.non_empty_attr("filtertype");
            let filter_field = element
                .non_empty_attr("filterfield")
                .or_else(|| element.non_empty_attr("filterField"));
            let (Some(filter_type), Some(filter_field)) = (filter_type, filter_field) else {
                return Err(ModelError::syntax(format!(
                    "filter set on {}, but filtertype or filterfield is missing",
                    context
                )));
            };
            let value = element.non_empty_attr("filtervalue").map(String::from);
            if value.is_none() {
                self.warn(
                    WarningKind::Filter,
                    format!("filtervalue is missing for filter on {}", context),
                );
            }
            field.filter = Some(FieldFilter {
                filter_type: filter_type.to_string(),
                field: filter_field.to_string(),
                value,
            });
        }

        if field.hidden && !field.nillable && field.default_value.is_empty() && !field.auto {
            return Err(ModelError::constraint(format!(
                "{} is hidden and not nillable, so it needs a default value",
                context
            )));
        }

        entity.add_field(field)?;
        if element.bool_attr("index") {
            entity.add_index(Index {
                name: name.clone(),
                fields: vec![name.clone()],
            });
        }
        if unique {
            entity.add_key(Unique::new(vec![name]))?;
        }
        Ok(())
    }

    fn parse_module(&mut self, model: &mut Model, element: &XmlElement) -> ModelResult<()> {
        let name = element
            .non_empty_attr("name")
            .ok_or_else(|| ModelError::syntax("name is missing for module"))?
            .trim();
        element.check_attributes(MODULE_ATTRIBUTES, &format!("in module '{}'", name))?;

        let path = format!("{}.{}", model.name, name);
        if model.modules.iter().any(|m| m.name == path) {
            return Err(ModelError::constraint(format!("duplicate module '{}'", path)));
        }
        let mut module = Module {
            name: path.clone(),
            label: element.non_empty_attr("label").unwrap_or(name).to_string(),
            description: None,
            entities: Vec::new(),
        };

        let mut description = String::new();
        for child in &element.children {
            match child.name.as_str() {
                "entity" => {
                    let entity = self.parse_entity(model, child, Some(path.as_str()))?;
                    module.entities.push(entity.name.clone());
                    model.add_entity(entity)?;
                }
                "description" => append_description(&mut description, child),
                other => self.warn(
                    WarningKind::IgnoredElement,
                    format!("element <{}> in module '{}' was skipped", other, path),
                ),
            }
        }
        module.description = Some(description).filter(|d| !d.is_empty());
        model.modules.push(module);
        Ok(())
    }

    fn parse_view(&mut self, element: &XmlElement) -> ModelResult<View> {
        let name = element
            .non_empty_attr("name")
            .ok_or_else(|| ModelError::syntax("name is missing for view"))?
            .trim();
        element.check_attributes(VIEW_ATTRIBUTES, &format!("in view '{}'", name))?;

        let entities = split_list(element.attr_or_empty("entities"));
        if entities.len() < 2 {
            return Err(ModelError::syntax(format!(
                "view '{}' needs at least two entities in its 'entities' attribute",
                name
            )));
        }
        for (i, entity) in entities.iter().enumerate() {
            if entities[..i].contains(entity) {
                return Err(ModelError::syntax(format!(
                    "entity '{}' is listed twice in view '{}'",
                    entity, name
                )));
            }
        }

        Ok(View {
            name: name.to_string(),
            label: element.non_empty_attr("label").unwrap_or(name).to_string(),
            entities,
            join_pairs: Vec::new(),
        })
    }

    fn parse_method(&mut self, element: &XmlElement) -> ModelResult<Method> {
        let name = element
            .non_empty_attr("name")
            .ok_or_else(|| ModelError::syntax("name is missing for method"))?
            .trim();
        element.check_attributes(METHOD_ATTRIBUTES, &format!("in method '{}'", name))?;

        let mut method = Method {
            name: name.to_string(),
            description: element.non_empty_attr("description").map(String::from),
            ..Default::default()
        };

        for child in &element.children {
            match child.name.as_str() {
                "description" => {
                    let mut description = method.description.take().unwrap_or_default();
                    append_description(&mut description, child);
                    method.description = Some(description).filter(|d| !d.is_empty());
                }
                "parameter" => {
                    let parameter = parse_parameter(name, child)?;
                    if method.parameter(&parameter.name).is_some() {
                        return Err(ModelError::constraint(format!(
                            "duplicate parameter '{}' in method '{}'",
                            parameter.name, name
                        )));
                    }
                    method.parameters.push(parameter);
                }
                "return" => {
                    child.check_attributes(&["type"], &format!("in method '{}'", name))?;
                    let return_type = child.non_empty_attr("type").ok_or_else(|| {
                        ModelError::syntax(format!("type is missing for return of method '{}'", name))
                    })?;
                    method.return_type = Some(return_type.trim().to_string());
                }
                "query" => method.query = Some(parse_query(name, child)?),
                other => self.warn(
                    WarningKind::IgnoredElement,
                    format!("element <{}> in method '{}' was skipped", other, name),
                ),
            }
        }
        Ok(method)
    }
}

fn trimmed(element: &XmlElement, attribute: &str) -> Option<String> {
    element.non_empty_attr(attribute).map(|v| v.trim().to_string())
}

fn append_description(target: &mut String, element: &XmlElement) {
    let text = element.text_content();
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(&text);
}

fn parse_length(element: &XmlElement, context: &str) -> ModelResult<usize> {
    match element.non_empty_attr("length") {
        Some(length) => length.trim().parse().map_err(|_| {
            ModelError::syntax(format!("length '{}' of {} is not a number", length, context))
        }),
        None => Ok(DEFAULT_STRING_LENGTH),
    }
}

fn parse_enum_options(element: &XmlElement, context: &str) -> ModelResult<Vec<String>> {
    let raw = element.attr_or_empty("enum_options").trim();
    let raw = raw.strip_prefix('[').unwrap_or(raw);
    let raw = raw.strip_suffix(']').unwrap_or(raw);
    let options = split_list(raw);
    if options.is_empty() {
        return Err(ModelError::syntax(format!(
            "enum_options must be ',' delimited for {}",
            context
        )));
    }
    Ok(options)
}

fn parse_xref_target(element: &XmlElement, context: &str, mref: bool) -> ModelResult<XrefTarget> {
    let mut entity = trimmed(element, "xref_entity");
    let mut field = trimmed(element, "xref_field").or_else(|| trimmed(element, "xref"));

    if entity.is_none() {
        if let Some((e, f)) = field.as_deref().and_then(|f| f.split_once('.')) {
            entity = Some(e.to_string());
            field = Some(f.to_string());
        }
    }

    let entity = match entity {
        Some(entity) => entity,
        None if mref && element.non_empty_attr("mref_name").is_some() => String::new(),
        None if mref => {
            return Err(ModelError::syntax(format!(
                "mref_name or xref_entity must be set for {}",
                context
            )));
        }
        None => {
            return Err(ModelError::syntax(format!(
                "xref_entity or a dotted xref_field must be set for {}",
                context
            )));
        }
    };

    let cascade = match element.attr("xref_cascade").map(str::trim) {
        None | Some("") => false,
        Some(v) if v.eq_ignore_ascii_case("true") => true,
        Some(other) => {
            return Err(ModelError::syntax(format!(
                "Unknown option on xref_cascade: '{}' for {}",
                other, context
            )));
        }
    };

    Ok(XrefTarget {
        entity,
        field,
        labels: split_list(element.attr_or_empty("xref_label")),
        cascade,
    })
}

/// Look up a field on the entity's parents and interfaces
fn find_inherited_field<'a>(model: &'a Model, entity: &Entity, name: &str) -> Option<&'a Field> {
    entity
        .parents
        .iter()
        .chain(entity.implements.iter())
        .find_map(|p| model.all_field(p, name))
}

fn parse_unique(model: &Model, entity: &mut Entity, element: &XmlElement) -> ModelResult<()> {
    element.check_attributes(UNIQUE_ATTRIBUTES, &format!("in entity '{}'", entity.name))?;

    let mut names = Vec::new();
    for name in split_list(element.attr_or_empty("fields")) {
        if !entity.has_field(&name) {
            let inherited = find_inherited_field(model, entity, &name).ok_or_else(|| {
                ModelError::reference(format!(
                    "unique field '{}' is not known in entity '{}' or its ancestors",
                    name, entity.name
                ))
            })?;
            let mut copy = inherited.clone();
            copy.system = true;
            copy.origin = FieldOrigin::ConstraintCopy;
            debug!(entity = %entity.name, field = %name, "promoted inherited field for unique key");
            entity.add_field(copy)?;
        }
        names.push(name);
    }
    for keyfield in element.children_named("keyfield") {
        let name = keyfield.non_empty_attr("name").ok_or_else(|| {
            ModelError::syntax(format!("keyfield without name in entity '{}'", entity.name))
        })?;
        names.push(name.trim().to_string());
    }

    if names.is_empty() {
        return Err(ModelError::syntax(format!(
            "missing fields on unique of '{}'. Expected <unique fields=\"field1[,field2,..]\" description=\"...\"/>",
            entity.name
        )));
    }

    let mut key = Unique::new(names);
    key.subclass = element.bool_attr("subclass");
    key.description = element.non_empty_attr("description").map(String::from);
    entity.add_key(key)
}

fn parse_indices(entity: &mut Entity, element: &XmlElement) -> ModelResult<()> {
    for index in element.children_named("index") {
        let name = index
            .non_empty_attr("name")
            .ok_or_else(|| ModelError::syntax(format!("name is missing for index in entity '{}'", entity.name)))?
            .trim()
            .to_string();

        let mut fields: Vec<String> = Vec::new();
        for indexfield in index.children_named("indexfield") {
            let field = indexfield.non_empty_attr("name").ok_or_else(|| {
                ModelError::syntax(format!(
                    "indexfield without name in index '{}' of entity '{}'",
                    name, entity.name
                ))
            })?;
            let field = field.trim().to_string();
            if !entity.has_field(&field) {
                return Err(ModelError::reference(format!(
                    "Missing index field: {} in index '{}' of entity '{}'",
                    field, name, entity.name
                )));
            }
            if fields.contains(&field) {
                return Err(ModelError::constraint(format!(
                    "field '{}' listed twice in index '{}' of entity '{}'",
                    field, name, entity.name
                )));
            }
            fields.push(field);
        }
        if fields.is_empty() {
            return Err(ModelError::syntax(format!(
                "index '{}' of entity '{}' has no indexfield",
                name, entity.name
            )));
        }
        entity.add_index(Index { name, fields });
    }
    Ok(())
}

fn parse_parameter(method: &str, element: &XmlElement) -> ModelResult<Parameter> {
    element.check_attributes(PARAMETER_ATTRIBUTES, &format!("in method '{}'", method))?;
    let name = element.non_empty_attr("name").ok_or_else(|| {
        ModelError::syntax(format!("name is missing for parameter of method '{}'", method))
    })?;
    let type_name = element.non_empty_attr("type").ok_or_else(|| {
        ModelError::syntax(format!(
            "type is missing for parameter '{}' of method '{}'",
            name, method
        ))
    })?;
    let kind = resolve_type(type_name).ok_or_else(|| {
        ModelError::type_error(format!(
            "type '{}' unknown for parameter '{}' of method '{}'",
            type_name, name, method
        ))
    })?;
    Ok(Parameter {
        name: name.trim().to_string(),
        label: element.non_empty_attr("label").unwrap_or(name).to_string(),
        kind: kind.name.as_str().to_string(),
        default_value: element.attr("default").map(String::from),
    })
}

fn parse_query(method: &str, element: &XmlElement) -> ModelResult<MethodQuery> {
    element.check_attributes(&["entity"], &format!("in query of method '{}'", method))?;
    let entity = element.non_empty_attr("entity").ok_or_else(|| {
        ModelError::syntax(format!("entity is missing for query of method '{}'", method))
    })?;
    let mut rules = Vec::new();
    for rule in element.children_named("rule") {
        rule.check_attributes(RULE_ATTRIBUTES, &format!("in query of method '{}'", method))?;
        let required = |attribute: &str| -> ModelResult<String> {
            rule.non_empty_attr(attribute)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| {
                    ModelError::syntax(format!(
                        "{} is missing for rule in query of method '{}'",
                        attribute, method
                    ))
                })
        };
        rules.push(QueryRule {
            field: required("field")?,
            operator: required("operator")?,
            parameter: required("parameter")?,
        });
    }
    Ok(MethodQuery {
        entity: entity.trim().to_string(),
        rules,
    })
}
