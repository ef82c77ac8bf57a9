//! End-to-end compilation tests

use data_model_compiler::{
    CompiledModel, CompilerOptions, Dialect, ErrorKind, FieldOrigin, FieldType,
    FileIncludeResolver, MappingStrategy, ModelCompiler, ModelError, ModelResult, WarningKind,
};

fn compile(schema: &str) -> ModelResult<CompiledModel> {
    ModelCompiler::default().compile(&[schema], None)
}

fn compile_with(options: CompilerOptions, schema: &str) -> ModelResult<CompiledModel> {
    ModelCompiler::new(options).compile(&[schema], None)
}

fn position(compiled: &CompiledModel, name: &str) -> usize {
    compiled
        .entity_order
        .iter()
        .position(|n| n == name)
        .unwrap()
}

const PETS: &str = r#"<molgenis name="petstore">
    <entity name="Pet">
        <field name="id" type="autoid"/>
        <field name="owner" type="xref" xref_entity="Person"/>
    </entity>
    <entity name="Person">
        <field name="id" type="autoid"/>
        <field name="name" type="string" unique="true"/>
    </entity>
</molgenis>"#;

mod scenario_tests {
    use super::*;

    #[test]
    fn test_person_pet_scenario() {
        let compiled = compile(PETS).unwrap();
        assert_eq!(compiled.entity_order, vec!["Person", "Pet"]);

        let owner = compiled.model.entity("Pet").unwrap().field("owner").unwrap();
        let target = owner.xref().unwrap();
        assert_eq!(target.entity, "Person");
        assert_eq!(target.field.as_deref(), Some("id"));
        assert_eq!(target.labels, vec!["name".to_string()]);
    }

    #[test]
    fn test_missing_mref_target() {
        let err = compile(
            r#"<molgenis name="m"><entity name="A">
                <field name="id" type="autoid"/>
                <field name="tags" type="mref" xref_entity="Tag"/>
            </entity></molgenis>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("Tag"));
    }

    #[test]
    fn test_schema_split_over_documents() {
        let people = r#"<molgenis name="petstore"><entity name="Person">
                <field name="id" type="autoid"/>
                <field name="name" type="string" unique="true"/>
            </entity></molgenis>"#;
        let pets = r#"<molgenis><entity name="Pet">
                <field name="id" type="autoid"/>
                <field name="owner" type="xref" xref_entity="Person"/>
            </entity></molgenis>"#;
        let compiled = ModelCompiler::default().compile(&[people, pets], None).unwrap();
        assert_eq!(compiled.model.name, "petstore");
        assert_eq!(compiled.entity_order, vec!["Person", "Pet"]);
    }
}

mod type_tests {
    use super::*;

    #[test]
    fn test_autoid_ignores_declared_flags() {
        let compiled = compile(
            r#"<molgenis name="m"><entity name="Sample">
                <field name="id" type="autoid" nillable="true" auto="false" readonly="false" unique="false"/>
            </entity></molgenis>"#,
        )
        .unwrap();
        let sample = compiled.model.entity("Sample").unwrap();
        let id = sample.field("id").unwrap();
        assert!(id.auto && id.readonly && !id.nillable);
        assert!(sample.has_key(&["id".to_string()]));
    }

    #[test]
    fn test_text_foreign_key_rejected() {
        let err = compile(
            r#"<molgenis name="m">
                <entity name="Note"><field name="id" type="autoid"/>
                    <field name="body" type="text" unique="true"/></entity>
                <entity name="Remark"><field name="id" type="autoid"/>
                    <field name="note" type="xref" xref_entity="Note" xref_field="body"/></entity>
            </molgenis>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("text"));
    }
}

mod inheritance_tests {
    use super::*;

    const ANIMALS: &str = r#"<molgenis name="zoo">
        <entity name="Dog" extends="Animal">
            <field name="breed" type="string"/>
        </entity>
        <entity name="Animal">
            <field name="id" type="autoid"/>
            <field name="name" type="string"/>
        </entity>
    </molgenis>"#;

    #[test]
    fn test_parent_key_propagates() {
        let compiled = compile(ANIMALS).unwrap();
        let dog = compiled.model.entity("Dog").unwrap();
        let id = dog.field("id").unwrap();
        assert!(id.hidden);
        assert_eq!(id.origin, FieldOrigin::InheritedKey);
        assert_eq!(id.xref_entity(), Some("Animal"));
        assert_eq!(dog.keys[0].fields, vec!["id".to_string()]);
        assert!(position(&compiled, "Animal") < position(&compiled, "Dog"));
    }

    #[test]
    fn test_subclass_per_table_discriminator() {
        let compiled = compile(ANIMALS).unwrap();
        let animal = compiled.model.entity("Animal").unwrap();
        let discriminator = &animal.fields[0];
        assert_eq!(discriminator.name, "type");
        assert_eq!(
            discriminator.field_type,
            FieldType::Enum {
                options: vec!["Animal".to_string(), "Dog".to_string()]
            }
        );
        assert!(compiled.model.entity("Dog").unwrap().field("type").is_none());
    }

    #[test]
    fn test_class_per_table_identity_root() {
        let options = CompilerOptions::builder()
            .mapping(MappingStrategy::ClassPerTable)
            .build();
        let compiled = compile_with(options, ANIMALS).unwrap();
        let root = compiled.model.entity("_AnimalInterface").unwrap();
        assert!(root.is_abstract);
        assert!(root.has_field("id"));
        assert_eq!(
            compiled.model.entity("Animal").unwrap().parents,
            vec!["_AnimalInterface".to_string()]
        );
        assert!(compiled.model.entity("Animal").unwrap().field("type").is_none());
    }
}

mod link_table_tests {
    use super::*;

    #[test]
    fn test_mref_join_entity() {
        let compiled = compile(
            r#"<molgenis name="m">
                <entity name="A"><field name="id" type="autoid"/>
                    <field name="bs" type="mref" xref_entity="B" mref_name="AB"/></entity>
                <entity name="B"><field name="id" type="autoid"/></entity>
            </molgenis>"#,
        )
        .unwrap();
        let join = compiled.model.entity("AB").unwrap();
        let to_b: Vec<_> = join
            .fields
            .iter()
            .filter(|f| f.xref_entity() == Some("B"))
            .collect();
        let to_a: Vec<_> = join
            .fields
            .iter()
            .filter(|f| f.xref_entity() == Some("A"))
            .collect();
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_a.len(), 1);
        assert!(join.has_key(&["A".to_string(), "B".to_string()]));
        assert!(position(&compiled, "A") < position(&compiled, "AB"));
        assert!(position(&compiled, "B") < position(&compiled, "AB"));
    }

    #[test]
    fn test_mref_name_only_reuses_declared_link_entity() {
        let compiled = compile(
            r#"<molgenis name="m">
                <entity name="B"><field name="id" type="autoid"/></entity>
                <entity name="A"><field name="id" type="autoid"/>
                    <field name="bs" type="mref" mref_name="AB"/></entity>
                <entity name="AB"><field name="id" type="autoid"/>
                    <field name="a" type="xref" xref_entity="A"/>
                    <field name="b" type="xref" xref_entity="B"/></entity>
            </molgenis>"#,
        )
        .unwrap();
        let bs = compiled.model.entity("A").unwrap().field("bs").unwrap();
        assert_eq!(bs.xref_entity(), Some("B"));
        let link = bs.field_type.mref_link().unwrap();
        assert_eq!(link.name.as_deref(), Some("AB"));
        assert_eq!(link.local_id.as_deref(), Some("a"));
        assert_eq!(link.remote_id.as_deref(), Some("b"));

        let join = compiled.model.entity("AB").unwrap();
        assert!(!join.association);
        assert!(!join.has_field("autoid"));
        assert_eq!(compiled.model.entities.len(), 3);
    }

    #[test]
    fn test_mref_name_only_follows_other_side() {
        let compiled = compile(
            r#"<molgenis name="m">
                <entity name="B"><field name="id" type="autoid"/>
                    <field name="alist" type="mref" xref_entity="A" mref_name="AB"/></entity>
                <entity name="A"><field name="id" type="autoid"/>
                    <field name="bs" type="mref" mref_name="AB"/></entity>
            </molgenis>"#,
        )
        .unwrap();
        let bs = compiled.model.entity("A").unwrap().field("bs").unwrap();
        assert_eq!(bs.xref_entity(), Some("B"));
        let link = bs.field_type.mref_link().unwrap();
        assert_eq!(link.local_id.as_deref(), Some("A"));
        assert_eq!(link.remote_id.as_deref(), Some("B"));

        let associations: Vec<&str> = compiled
            .model
            .entities
            .iter()
            .filter(|e| e.association)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(associations, vec!["AB"]);
        let join = compiled.model.entity("AB").unwrap();
        assert_eq!(join.field("B").unwrap().xref_entity(), Some("B"));
        assert_eq!(join.field("A").unwrap().xref_entity(), Some("A"));
    }

    #[test]
    fn test_mref_name_only_without_source() {
        let err = compile(
            r#"<molgenis name="m">
                <entity name="A"><field name="id" type="autoid"/>
                    <field name="bs" type="mref" mref_name="AB"/></entity>
            </molgenis>"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("AB"));
    }

    #[test]
    fn test_self_referencing_mref() {
        let compiled = compile(
            r#"<molgenis name="m"><entity name="Person">
                <field name="id" type="autoid"/>
                <field name="friends" type="mref" xref_entity="Person"/>
            </entity></molgenis>"#,
        )
        .unwrap();
        let join = compiled.model.entity("Person_friends").unwrap();
        assert_eq!(join.field("Person_self").unwrap().xref_entity(), Some("Person"));
        assert_eq!(join.field("Person").unwrap().xref_entity(), Some("Person"));
        assert_eq!(compiled.entity_order, vec!["Person", "Person_friends"]);
    }
}

mod dialect_tests {
    use super::*;

    fn researchers(field_a: &str, field_b: &str, explicit: Option<&str>) -> String {
        let link = explicit
            .map(|name| format!(r#" mref_name="{}""#, name))
            .unwrap_or_default();
        format!(
            r#"<molgenis name="m">
                <entity name="Paper"><field name="id" type="autoid"/></entity>
                <entity name="Researcher"><field name="id" type="autoid"/>
                    <field name="{}" type="mref" xref_entity="Paper"{}/>
                    <field name="{}" type="mref" xref_entity="Paper"/>
                </entity>
            </molgenis>"#,
            field_a, link, field_b
        )
    }

    fn oracle() -> CompilerOptions {
        CompilerOptions::builder().dialect(Dialect::Oracle).build()
    }

    #[test]
    fn test_thirty_characters_preserved() {
        let schema = researchers("publicationsrecords", "reviews", None);
        let compiled = compile_with(oracle(), &schema).unwrap();
        assert!(compiled.model.has_entity("Researcher_publicationsrecords"));
    }

    #[test]
    fn test_generated_names_mangled() {
        let schema = researchers("publicationsrecordsx", "publicationsrecordsy", None);
        let compiled = compile_with(oracle(), &schema).unwrap();
        let links: Vec<String> = compiled
            .model
            .entities
            .iter()
            .filter(|e| e.association)
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(links.len(), 2);
        assert_ne!(links[0], links[1]);
        for link in &links {
            assert_eq!(link.chars().count(), 30);
            assert!(link.starts_with("Researcher_publicationsre"));
            assert!(link[25..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_explicit_long_name_rejected() {
        let name = "R".repeat(31);
        let schema = researchers("papers", "reviews", Some(&name));
        let err = compile_with(oracle(), &schema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Constraint);
        assert!(compile(&schema).is_ok());
    }

    #[test]
    fn test_reserved_word_rejected() {
        for schema in [
            r#"<molgenis name="m"><entity name="select"><field name="id" type="autoid"/></entity></molgenis>"#,
            r#"<molgenis name="m"><entity name="Query"><field name="id" type="autoid"/>
                <field name="SELECT" type="string"/></entity></molgenis>"#,
        ] {
            let err = compile(schema).unwrap_err();
            assert!(matches!(err, ModelError::Constraint(_)));
            assert!(err.to_string().to_lowercase().contains("select"));
        }
    }

    fn account(field: &str) -> String {
        format!(
            r#"<molgenis name="m"><entity name="Account"><field name="id" type="autoid"/>
                <field name="{}" type="int"/></entity></molgenis>"#,
            field
        )
    }

    #[test]
    fn test_oracle_words_reserved_everywhere() {
        let mysql = CompilerOptions::builder().dialect(Dialect::Mysql).build();
        for options in [CompilerOptions::default(), mysql, oracle()] {
            let err = compile_with(options, &account("level")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Constraint);
            assert!(err.to_string().contains("level"));
        }
        let err = compile(&account("comment")).unwrap_err();
        assert!(err.to_string().contains("comment"));
    }

    #[test]
    fn test_dialect_specific_reserved_word() {
        let mysql = || CompilerOptions::builder().dialect(Dialect::Mysql).build();
        assert!(compile(&account("limit")).is_ok());
        let err = compile_with(mysql(), &account("limit")).unwrap_err();
        assert!(err.to_string().contains("limit"));
        assert!(compile_with(mysql(), &account("type")).is_ok());
    }
}

mod ordering_tests {
    use super::*;

    #[test]
    fn test_cycle_is_tolerated() {
        let compiled = compile(
            r#"<molgenis name="m">
                <entity name="A"><field name="id" type="autoid"/>
                    <field name="b" type="xref" xref_entity="B" nillable="true"/></entity>
                <entity name="B"><field name="id" type="autoid"/>
                    <field name="a" type="xref" xref_entity="A" nillable="true"/></entity>
            </molgenis>"#,
        )
        .unwrap();
        assert_eq!(compiled.entity_order, vec!["A", "B"]);
        assert!(
            compiled
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::DependencyCycle)
        );
    }
}

mod ui_tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_ui_with_file_include() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pets.xml"),
            r#"<molgenis><form name="pets" entity="Pet" hide_fields="owner"/></molgenis>"#,
        )
        .unwrap();
        let ui = r#"<molgenis name="petstore">
            <menu name="main">
                <form name="people" entity="Person"/>
            </menu>
            <include file="pets.xml"/>
        </molgenis>"#;

        let compiled = ModelCompiler::default()
            .with_include_resolver(FileIncludeResolver::new(dir.path()))
            .compile(&[PETS], Some(ui))
            .unwrap();
        assert!(compiled.model.ui.find("people").is_some());
        assert!(compiled.model.ui.find("pets").is_some());
        assert!(
            compiled
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::HiddenField && w.message.contains("Pet.owner"))
        );
    }

    #[test]
    fn test_missing_include_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelCompiler::default()
            .with_include_resolver(FileIncludeResolver::new(dir.path()))
            .compile(&[PETS], Some(r#"<molgenis><include file="absent.xml"/></molgenis>"#))
            .unwrap_err();
        assert!(matches!(err, ModelError::Include { .. }));
    }
}

mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_options_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "dialect = \"oracle\"\nauthorizable = [\"Pet\"]").unwrap();

        let options = CompilerOptions::load(file.path()).unwrap();
        let compiled = compile_with(options, PETS).unwrap();
        assert!(compiled.model.entity("Pet").unwrap().authorizable);
        assert!(!compiled.model.entity("Person").unwrap().authorizable);
    }

    #[test]
    fn test_authorizable_interface_appended() {
        let schema = r#"<molgenis name="m">
            <entity name="Authorizable" abstract="true">
                <field name="canRead" type="string" nillable="true"/>
            </entity>
            <entity name="Study"><field name="id" type="autoid"/></entity>
        </molgenis>"#;
        let options = CompilerOptions::builder().authorizable("Study").build();
        let compiled = compile_with(options, schema).unwrap();
        let study = compiled.model.entity("Study").unwrap();
        assert_eq!(study.implements, vec!["Authorizable".to_string()]);
    }
}
