//! Field model

use serde::{Deserialize, Serialize};

/// Default length of `string` fields
pub const DEFAULT_STRING_LENGTH: usize = 255;

/// Target of a single- or multi-valued reference
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XrefTarget {
    /// Referenced entity
    pub entity: String,
    /// Referenced field; defaults to the entity's primary key during resolution
    pub field: Option<String>,
    /// Display label fields on the target
    pub labels: Vec<String>,
    /// Cascade deletes from the target
    pub cascade: bool,
}

impl XrefTarget {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Default::default()
        }
    }
}

/// Naming of the join entity behind a many-to-many field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MrefLink {
    /// Join entity name
    pub name: Option<String>,
    /// Column pointing back at the owning entity
    pub local_id: Option<String>,
    /// Column pointing at the target entity
    pub remote_id: Option<String>,
}

/// Closed set of field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    String { length: usize },
    Int,
    Long,
    Decimal,
    Bool,
    Date,
    DateTime,
    Text,
    File,
    Hyperlink,
    Email,
    Enum { options: Vec<String> },
    Xref(XrefTarget),
    Mref { target: XrefTarget, link: MrefLink },
}

impl FieldType {
    /// Canonical type name as used in the schema language
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String { .. } => "string",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Decimal => "decimal",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Text => "text",
            FieldType::File => "file",
            FieldType::Hyperlink => "hyperlink",
            FieldType::Email => "email",
            FieldType::Enum { .. } => "enum",
            FieldType::Xref(_) => "xref",
            FieldType::Mref { .. } => "mref",
        }
    }

    /// Reference target of an xref or mref
    pub fn xref(&self) -> Option<&XrefTarget> {
        match self {
            FieldType::Xref(target) | FieldType::Mref { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn xref_mut(&mut self) -> Option<&mut XrefTarget> {
        match self {
            FieldType::Xref(target) | FieldType::Mref { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn mref_link(&self) -> Option<&MrefLink> {
        match self {
            FieldType::Mref { link, .. } => Some(link),
            _ => None,
        }
    }

    pub fn mref_link_mut(&mut self) -> Option<&mut MrefLink> {
        match self {
            FieldType::Mref { link, .. } => Some(link),
            _ => None,
        }
    }

    pub fn is_mref(&self) -> bool {
        matches!(self, FieldType::Mref { .. })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Xref(_) | FieldType::Mref { .. })
    }
}

/// Where a field came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Declared in the schema document
    #[default]
    Declared,
    /// Primary key copied from a parent or interface
    InheritedKey,
    /// Copied from an ancestor so a local key can refer to it
    ConstraintCopy,
    /// Injected `type` discriminator
    Discriminator,
    /// Column of a synthesized join entity
    LinkTable,
    /// Many-to-many field moved down from an interface
    InterfaceMref,
}

/// Filter settings on a field or form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub filter_type: String,
    pub field: String,
    pub value: Option<String>,
}

/// A column of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub nillable: bool,
    pub auto: bool,
    pub readonly: bool,
    pub default_value: String,
    pub default_code: Option<String>,
    pub hidden: bool,
    pub system: bool,
    pub description: Option<String>,
    pub filter: Option<FieldFilter>,
    pub origin: FieldOrigin,
}

impl Field {
    /// Create a non-nillable field with the label set to its name
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            field_type,
            nillable: false,
            auto: false,
            readonly: false,
            default_value: String::new(),
            default_code: None,
            hidden: false,
            system: false,
            description: None,
            filter: None,
            origin: FieldOrigin::Declared,
        }
    }

    /// Hidden auto-increment integer, the shape used for synthesized primary keys
    pub fn auto_id(name: impl Into<String>) -> Self {
        let mut field = Field::new(name, FieldType::Int);
        field.auto = true;
        field.readonly = true;
        field.hidden = true;
        field
    }

    /// True for an auto-increment identity column.
    ///
    /// Inherited key copies keep the auto flag of the key they mirror, so they
    /// count even though they are typed as references.
    pub fn is_auto_id(&self) -> bool {
        self.auto
            && (matches!(self.field_type, FieldType::Int)
                || self.origin == FieldOrigin::InheritedKey)
    }

    pub fn xref(&self) -> Option<&XrefTarget> {
        self.field_type.xref()
    }

    pub fn xref_mut(&mut self) -> Option<&mut XrefTarget> {
        self.field_type.xref_mut()
    }

    pub fn xref_entity(&self) -> Option<&str> {
        self.xref().map(|x| x.entity.as_str())
    }

    /// Copy of this field that references `entity` through `field`.
    ///
    /// Flags and description are kept; the copy is hidden and typed as an xref.
    pub fn reference_copy(&self, entity: &str, origin: FieldOrigin) -> Field {
        let mut copy = self.clone();
        copy.field_type = FieldType::Xref(XrefTarget {
            entity: entity.to_string(),
            field: Some(self.name.clone()),
            labels: vec![self.name.clone()],
            cascade: false,
        });
        copy.hidden = true;
        copy.origin = origin;
        copy
    }
}
