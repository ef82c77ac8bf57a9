//! ui-schema importer
//!
//! Builds the menu/form/tree/plugin tree under the model's UI root. Forms and
//! trees must point at entities of an already parsed db-schema.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::db_schema::split_list;
use super::document::{XmlElement, parse_document};
use crate::config::Dialect;
use crate::error::{ModelError, ModelResult, StructuralWarning, WarningKind};
use crate::models::{
    DEFAULT_FORM_LIMIT, FormFilter, FormSpec, FormView, Model, PluginSpec, SortOrder, TreeSpec,
    UiKind, UiNode,
};
use crate::validation::names::check_identifier;

/// Elements allowed directly under the ui-schema root
const ROOT_ELEMENTS: &[&str] = &["description", "form", "plugin", "menu", "include"];

/// Includes nested deeper than this are treated as a loop
const MAX_INCLUDE_DEPTH: usize = 16;

/// Loads the document named by an `<include file="..."/>` element
pub trait IncludeResolver {
    fn resolve(&self, file: &str) -> ModelResult<String>;
}

/// Resolves includes relative to a base directory
#[derive(Debug, Clone)]
pub struct FileIncludeResolver {
    base: PathBuf,
}

impl FileIncludeResolver {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }
}

impl IncludeResolver for FileIncludeResolver {
    fn resolve(&self, file: &str) -> ModelResult<String> {
        let path = self.base.join(file);
        std::fs::read_to_string(&path).map_err(|e| ModelError::Include {
            file: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Resolver for callers that do not support includes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&self, file: &str) -> ModelResult<String> {
        Err(ModelError::Include {
            file: file.to_string(),
            reason: "includes are not supported here".to_string(),
        })
    }
}

/// ui-schema importer
#[derive(Debug, Default)]
pub struct UiParser {
    pub warnings: Vec<StructuralWarning>,
    dialect: Dialect,
}

impl UiParser {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            dialect: Dialect::default(),
        }
    }

    /// Check a model name given by the ui-schema against `dialect`
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Parse a ui-schema document into `model.ui`
    pub fn parse_into(
        &mut self,
        model: &mut Model,
        content: &str,
        resolver: &dyn IncludeResolver,
    ) -> ModelResult<()> {
        let root = parse_document(content)?;
        for element in &root.children {
            if !ROOT_ELEMENTS.contains(&element.name.as_str()) {
                return Err(ModelError::syntax(format!(
                    "Unrecognized element: <{}> (allowed: {})",
                    element.name,
                    ROOT_ELEMENTS.join(", ")
                )));
            }
        }

        if let Some(name) = root.non_empty_attr("name") {
            let name = name.trim();
            check_identifier("model", name, self.dialect)?;
            model.name = name.to_string();
        }
        if let Some(label) = root.non_empty_attr("label") {
            model.label = label.to_string();
        }

        let mut ui = std::mem::replace(&mut model.ui, UiNode::root(String::new()));
        ui.name = model.name.clone();
        ui.label = model.label.clone();
        let result = self.parse_children(model, &mut ui, &root.children, resolver, 0);
        model.ui = ui;
        result?;
        debug!(nodes = model.ui.walk().len(), "parsed ui-schema document");
        Ok(())
    }

    fn warn(&mut self, kind: WarningKind, message: String) {
        self.warnings.push(StructuralWarning::new(kind, message));
    }

    fn parse_children(
        &mut self,
        model: &Model,
        parent: &mut UiNode,
        elements: &[XmlElement],
        resolver: &dyn IncludeResolver,
        depth: usize,
    ) -> ModelResult<()> {
        for element in elements {
            match element.name.as_str() {
                "include" => {
                    let file = element.non_empty_attr("file").ok_or_else(|| {
                        ModelError::syntax("include failed: no file attribute set")
                    })?;
                    if depth >= MAX_INCLUDE_DEPTH {
                        return Err(ModelError::Include {
                            file: file.to_string(),
                            reason: "includes are nested too deeply".to_string(),
                        });
                    }
                    let included = parse_document(&resolver.resolve(file)?)?;
                    debug!(file, "including ui-schema document");
                    self.parse_children(model, parent, &included.children, resolver, depth + 1)?;
                }
                "description" => self.warn(
                    WarningKind::IgnoredElement,
                    "the <description> element is not supported in a ui-schema".to_string(),
                ),
                "menu" | "form" | "tree" | "plugin" => {
                    let mut node = self.parse_node(model, element, &parent.name)?;
                    self.parse_children(model, &mut node, &element.children, resolver, depth)?;
                    parent.children.push(node);
                }
                other => self.warn(
                    WarningKind::IgnoredElement,
                    format!("element <{}> under '{}' was skipped", other, parent.name),
                ),
            }
        }
        Ok(())
    }

    fn parse_node(&mut self, model: &Model, element: &XmlElement, parent: &str) -> ModelResult<UiNode> {
        let tag = element.name.as_str();
        let name = match element.non_empty_attr("name") {
            Some(name) => name.trim().to_string(),
            None if tag == "form" => element
                .non_empty_attr("entity")
                .map(|e| e.trim().to_string())
                .ok_or_else(|| ModelError::syntax(format!("name is missing for <form> under '{}'", parent)))?,
            None => {
                return Err(ModelError::syntax(format!(
                    "name is missing for <{}> under '{}'",
                    tag, parent
                )));
            }
        };

        let group = element.non_empty_attr("group").map(String::from);
        let group_read = element.non_empty_attr("groupRead").map(String::from);
        if group.is_some() && group == group_read {
            return Err(ModelError::constraint(format!(
                "cannot assign both read/write and read rights on '{}'",
                name
            )));
        }

        let mut namespace = model.name.clone();
        let kind = match tag {
            "menu" => UiKind::Menu {
                position: element.non_empty_attr("position").map(String::from),
            },
            "form" => {
                let form = self.parse_form(model, element, &name)?;
                if let Some(entity) = model.entity(&form.entity) {
                    namespace = entity.namespace.clone();
                }
                UiKind::Form(form)
            }
            "tree" => {
                let tree = parse_tree(model, element, &name)?;
                if let Some(entity) = model.entity(&tree.entity) {
                    namespace = entity.namespace.clone();
                }
                UiKind::Tree(tree)
            }
            _ => UiKind::Plugin(PluginSpec {
                plugin_type: element
                    .non_empty_attr("type")
                    .ok_or_else(|| ModelError::syntax(format!("plugin '{}' has no type", name)))?
                    .trim()
                    .to_string(),
                flavor: element.non_empty_attr("flavor").map(String::from),
                readonly: element.bool_attr("readonly"),
            }),
        };

        Ok(UiNode {
            label: element.non_empty_attr("label").unwrap_or(&name).to_string(),
            name,
            namespace,
            group,
            group_read,
            kind,
            children: Vec::new(),
        })
    }

    fn parse_form(&mut self, model: &Model, element: &XmlElement, name: &str) -> ModelResult<FormSpec> {
        let entity_name = element
            .non_empty_attr("entity")
            .ok_or_else(|| ModelError::syntax(format!("entity is missing for form '{}'", name)))?
            .trim();
        let entity = model.entity_ignore_case(entity_name).ok_or_else(|| {
            ModelError::reference(format!(
                "form '{}': entity '{}' does not exist",
                name, entity_name
            ))
        })?;

        let view = match element.attr_or_empty("view").trim().to_lowercase().as_str() {
            "" if element.children.is_empty() => FormView::List,
            "" | "edit" | "record" => FormView::Edit,
            "list" => FormView::List,
            other => {
                return Err(ModelError::syntax(format!(
                    "form '{}': view '{}' unknown (use list or edit)",
                    name, other
                )));
            }
        };

        let limit = match element.non_empty_attr("limit") {
            Some(limit) => limit.trim().parse().map_err(|_| {
                ModelError::syntax(format!("form '{}': limit '{}' is not a number", name, limit))
            })?,
            None => DEFAULT_FORM_LIMIT,
        };

        let sort_order = match element.non_empty_attr("sortorder").map(|s| s.trim().to_lowercase()) {
            None => None,
            Some(order) if order == "asc" => Some(SortOrder::Asc),
            Some(order) if order == "desc" => Some(SortOrder::Desc),
            Some(order) => {
                return Err(ModelError::syntax(format!(
                    "form '{}': sortorder '{}' must be asc or desc",
                    name, order
                )));
            }
        };

        let filter = if element.bool_attr("filter") {
            let field = element.non_empty_attr("filterfield");
            let filter_type = element.non_empty_attr("filtertype");
            let (Some(field), Some(filter_type)) = (field, filter_type) else {
                return Err(ModelError::syntax(format!(
                    "form '{}': filter set, but filterfield or filtertype is missing",
                    name
                )));
            };
            let value = element.non_empty_attr("filtervalue").map(String::from);
            if value.is_none() {
                self.warn(
                    WarningKind::Filter,
                    format!("form '{}': filtervalue is missing", name),
                );
            }
            Some(FormFilter {
                field: field.to_string(),
                filter_type: filter_type.to_string(),
                value,
            })
        } else {
            None
        };

        let resolve_fields = |attribute: &str| -> ModelResult<Vec<String>> {
            split_list(element.attr_or_empty(attribute))
                .into_iter()
                .map(|f| {
                    model
                        .all_field_ignore_case(&entity.name, &f)
                        .map(|field| field.name.clone())
                        .ok_or_else(|| {
                            ModelError::reference(format!(
                                "form '{}': cannot find field '{}' of {} in entity '{}'",
                                name, f, attribute, entity.name
                            ))
                        })
                })
                .collect()
        };
        let hide_fields = resolve_fields("hide_fields")?;
        let compact_view = resolve_fields("compact_view")?
            .into_iter()
            .map(|f| format!("{}_{}", entity.name, f))
            .collect();

        Ok(FormSpec {
            entity: entity.name.clone(),
            view,
            limit,
            readonly: element.bool_attr("readonly"),
            header: element.non_empty_attr("header").map(String::from),
            description: element.non_empty_attr("description").map(String::from),
            commands: split_list(element.attr_or_empty("commands")),
            sort_by: element.non_empty_attr("sortby").map(String::from),
            sort_order,
            filter,
            hide_fields,
            compact_view,
        })
    }
}

fn parse_tree(model: &Model, element: &XmlElement, name: &str) -> ModelResult<TreeSpec> {
    let required = |attribute: &str| -> ModelResult<String> {
        element
            .non_empty_attr(attribute)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| ModelError::syntax(format!("tree '{}': {} is missing", name, attribute)))
    };
    let entity_name = required("entity")?;
    let parent_field = required("parentfield")?;
    let id_field = required("idfield")?;
    let label_field = required("labelfield")?;

    let entity = model.entity_ignore_case(&entity_name).ok_or_else(|| {
        ModelError::reference(format!("tree '{}': entity '{}' does not exist", name, entity_name))
    })?;
    let field = |field: &str| -> ModelResult<String> {
        model
            .all_field_ignore_case(&entity.name, field)
            .map(|f| f.name.clone())
            .ok_or_else(|| {
                ModelError::reference(format!(
                    "tree '{}': field '{}' does not exist in entity '{}'",
                    name, field, entity.name
                ))
            })
    };

    Ok(TreeSpec {
        entity: entity.name.clone(),
        parent_field: field(&parent_field)?,
        id_field: field(&id_field)?,
        label_field: field(&label_field)?,
        readonly: element.bool_attr_or("readonly", true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::SchemaParser;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, String>);

    impl IncludeResolver for MapResolver {
        fn resolve(&self, file: &str) -> ModelResult<String> {
            self.0.get(file).cloned().ok_or_else(|| ModelError::Include {
                file: file.to_string(),
                reason: "not found".to_string(),
            })
        }
    }

    fn model() -> Model {
        SchemaParser::new()
            .parse(
                r#"<molgenis name="zoo">
                    <entity name="Person">
                        <field name="id" type="autoid"/>
                        <field name="Name" type="string"/>
                        <field name="parent" type="xref" xref_entity="Person" nillable="true"/>
                    </entity>
                </molgenis>"#,
            )
            .unwrap()
    }

    fn parse_ui(model: &mut Model, xml: &str) -> ModelResult<UiParser> {
        let mut parser = UiParser::new();
        parser.parse_into(model, xml, &NoIncludes)?;
        Ok(parser)
    }

    #[test]
    fn test_menu_with_forms() {
        let mut model = model();
        parse_ui(
            &mut model,
            r#"<molgenis label="Zoo">
                <menu name="main" position="left">
                    <form entity="person" hide_fields="name" compact_view="id,name" sortorder="DESC" limit="25"/>
                    <plugin name="stats" type="org.example.Stats"/>
                </menu>
            </molgenis>"#,
        )
        .unwrap();

        assert_eq!(model.label, "Zoo");
        let menu = &model.ui.children[0];
        assert_eq!(menu.kind, UiKind::Menu { position: Some("left".to_string()) });
        assert_eq!(menu.children.len(), 2);

        let form = model.ui.forms()[0].clone();
        assert_eq!(form.entity, "Person");
        assert_eq!(form.view, FormView::List);
        assert_eq!(form.limit, 25);
        assert_eq!(form.sort_order, Some(SortOrder::Desc));
        assert_eq!(form.hide_fields, vec!["Name".to_string()]);
        assert_eq!(form.compact_view, vec!["Person_id".to_string(), "Person_Name".to_string()]);
        assert_eq!(menu.children[0].name, "person");
    }

    #[test]
    fn test_form_view_defaults() {
        let mut model = model();
        parse_ui(
            &mut model,
            r#"<molgenis>
                <form name="outer" entity="Person">
                    <form name="inner" entity="Person" view="record"/>
                </form>
            </molgenis>"#,
        )
        .unwrap();
        let forms = model.ui.forms();
        assert_eq!(forms[0].view, FormView::Edit);
        assert_eq!(forms[1].view, FormView::Edit);
        assert_eq!(forms[0].limit, DEFAULT_FORM_LIMIT);
    }

    #[test]
    fn test_unrecognized_root_element() {
        let mut model = model();
        let result = parse_ui(&mut model, r#"<molgenis><screen name="x"/></molgenis>"#);
        assert!(matches!(result, Err(ModelError::Syntax(_))));
    }

    #[test]
    fn test_model_name_checked() {
        let mut model = model();
        let result = parse_ui(&mut model, r#"<molgenis name="my zoo"/>"#);
        assert!(matches!(result, Err(ModelError::Constraint(_))));
        let result = parse_ui(&mut model, r#"<molgenis name="Select"/>"#);
        assert!(matches!(result, Err(ModelError::Constraint(_))));
        assert_eq!(model.name, "zoo");

        let mut parser = UiParser::new().with_dialect(Dialect::Mysql);
        let result = parser.parse_into(&mut model, r#"<molgenis name="Schema"/>"#, &NoIncludes);
        assert!(matches!(result, Err(ModelError::Constraint(_))));
        parse_ui(&mut model, r#"<molgenis name="Schema"/>"#).unwrap();
        assert_eq!(model.name, "Schema");
    }

    #[test]
    fn test_form_errors() {
        let mut model = model();
        let result = parse_ui(&mut model, r#"<molgenis><form name="f" entity="Animal"/></molgenis>"#);
        assert!(matches!(result, Err(ModelError::Reference(_))));

        let result = parse_ui(
            &mut model,
            r#"<molgenis><form name="f" entity="Person" hide_fields="age"/></molgenis>"#,
        );
        assert!(matches!(result, Err(ModelError::Reference(_))));

        let result = parse_ui(
            &mut model,
            r#"<molgenis><form name="f" entity="Person" sortorder="up"/></molgenis>"#,
        );
        assert!(matches!(result, Err(ModelError::Syntax(_))));

        let result = parse_ui(
            &mut model,
            r#"<molgenis><form name="f" entity="Person" group="admin" groupRead="admin"/></molgenis>"#,
        );
        assert!(matches!(result, Err(ModelError::Constraint(_))));
    }

    #[test]
    fn test_form_filter_without_value_warns() {
        let mut model = model();
        let parser = parse_ui(
            &mut model,
            r#"<molgenis><form name="f" entity="Person" filter="true" filterfield="Name" filtertype="equals"/></molgenis>"#,
        )
        .unwrap();
        assert_eq!(parser.warnings.len(), 1);
        assert_eq!(parser.warnings[0].kind, WarningKind::Filter);
    }

    #[test]
    fn test_tree_and_plugin() {
        let mut model = model();
        parse_ui(
            &mut model,
            r#"<molgenis><menu name="m">
                <tree name="family" entity="Person" parentfield="parent" idfield="id" labelfield="name"/>
            </menu></molgenis>"#,
        )
        .unwrap();
        let tree = &model.ui.children[0].children[0];
        match &tree.kind {
            UiKind::Tree(tree_spec) => {
                assert!(tree_spec.readonly);
                assert_eq!(tree_spec.label_field, "Name");
            }
            other => panic!("expected tree, got {:?}", other),
        }

        let result = parse_ui(
            &mut model,
            r#"<molgenis><menu name="m"><tree name="t" entity="Person" idfield="id" labelfield="Name"/></menu></molgenis>"#,
        );
        assert!(matches!(result, Err(ModelError::Syntax(_))));

        let result = parse_ui(&mut model, r#"<molgenis><plugin name="p"/></molgenis>"#);
        assert!(matches!(result, Err(ModelError::Syntax(_))));
    }

    #[test]
    fn test_include_splices_children() {
        let mut model = model();
        let mut files = HashMap::new();
        files.insert(
            "people.xml".to_string(),
            r#"<molgenis><form name="people" entity="Person"/><menu name="more"/></molgenis>"#
                .to_string(),
        );
        let mut parser = UiParser::new();
        parser
            .parse_into(
                &mut model,
                r#"<molgenis><menu name="main"><include file="people.xml"/></menu></molgenis>"#,
                &MapResolver(files),
            )
            .unwrap();
        let main = &model.ui.children[0];
        let names: Vec<&str> = main.children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["people", "more"]);

        let result = UiParser::new().parse_into(
            &mut model,
            r#"<molgenis><include file="missing.xml"/></molgenis>"#,
            &NoIncludes,
        );
        assert!(matches!(result, Err(ModelError::Include { .. })));
    }

    #[test]
    fn test_file_include_resolver() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part.xml"), "<ui/>").unwrap();
        let resolver = FileIncludeResolver::new(dir.path());
        assert_eq!(resolver.resolve("part.xml").unwrap(), "<ui/>");
        assert!(resolver.resolve("other.xml").is_err());
    }
}
