//! Compiler configuration
//!
//! Options are usually built in code through [`CompilerOptions::builder`], but
//! can also be loaded from a TOML or YAML file:
//!
//! ```toml
//! dialect = "oracle"
//! mapping = "class_per_table"
//! authorizable = ["Investigation", "Protocol"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Target SQL engine. Selects the reserved-word set and the identifier length limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Generic,
    Oracle,
    Mysql,
    Postgresql,
    Hsqldb,
}

impl Dialect {
    /// Maximum identifier length for entity, field and link-table names
    pub fn identifier_limit(&self) -> Option<usize> {
        match self {
            Dialect::Generic => None,
            Dialect::Oracle => Some(30),
            Dialect::Mysql => Some(64),
            Dialect::Postgresql => Some(63),
            Dialect::Hsqldb => Some(128),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::Oracle => "oracle",
            Dialect::Mysql => "mysql",
            Dialect::Postgresql => "postgresql",
            Dialect::Hsqldb => "hsqldb",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" | "" => Ok(Dialect::Generic),
            "oracle" => Ok(Dialect::Oracle),
            "mysql" => Ok(Dialect::Mysql),
            "postgres" | "postgresql" => Ok(Dialect::Postgresql),
            "hsql" | "hsqldb" => Ok(Dialect::Hsqldb),
            other => Err(format!("Unknown dialect: {}", other)),
        }
    }
}

/// How an inheritance hierarchy is laid out in tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStrategy {
    /// Discriminator column on the root ancestor; subclasses join on the inherited key
    #[default]
    SubclassPerTable,
    /// Synthetic abstract identity root per hierarchy
    ClassPerTable,
}

impl FromStr for MappingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "subclass_per_table" => Ok(MappingStrategy::SubclassPerTable),
            "class_per_table" => Ok(MappingStrategy::ClassPerTable),
            other => Err(format!("Unknown mapping strategy: {}", other)),
        }
    }
}

/// Options consumed by the compiler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct CompilerOptions {
    /// Target SQL dialect
    pub dialect: Dialect,

    /// Inheritance mapping strategy
    pub mapping: MappingStrategy,

    /// Entities tagged with the Authorizable capability
    pub authorizable: Vec<String>,
}

impl CompilerOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom options
    pub fn builder() -> CompilerOptionsBuilder {
        CompilerOptionsBuilder::default()
    }

    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse compiler options as TOML")
    }

    /// Parse options from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse compiler options as YAML")
    }

    /// Load options from a `.toml`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }
}

/// Builder for CompilerOptions
#[derive(Debug, Default)]
pub struct CompilerOptionsBuilder {
    options: CompilerOptions,
}

impl CompilerOptionsBuilder {
    /// Set the target dialect
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.options.dialect = dialect;
        self
    }

    /// Set the inheritance mapping strategy
    pub fn mapping(mut self, mapping: MappingStrategy) -> Self {
        self.options.mapping = mapping;
        self
    }

    /// Tag one more entity as authorizable
    pub fn authorizable(mut self, entity: impl Into<String>) -> Self {
        self.options.authorizable.push(entity.into());
        self
    }

    /// Build the options
    pub fn build(self) -> CompilerOptions {
        self.options
    }
}
