//! Identifier rules: reserved words, whitespace, length limits, default link
//! naming and field-name case correction

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

use super::dialect::is_reserved;
use crate::config::Dialect;
use crate::error::{ModelError, ModelResult};
use crate::models::{FieldType, Model};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").unwrap());

/// Digits of the hash appended to a truncated identifier
const HASH_DIGITS: usize = 5;

/// True when the name contains any whitespace character
pub fn contains_whitespace(name: &str) -> bool {
    WHITESPACE.is_match(name)
}

/// Reject whitespace and reserved words in an identifier
pub fn check_identifier(kind: &str, name: &str, dialect: Dialect) -> ModelResult<()> {
    if contains_whitespace(name) {
        return Err(ModelError::constraint(format!(
            "{} name '{}' contains whitespace",
            kind, name
        )));
    }
    if is_reserved(name, dialect) {
        return Err(ModelError::constraint(format!(
            "{} name '{}' is a reserved word for dialect {}",
            kind, name, dialect
        )));
    }
    Ok(())
}

/// Check the model, module, entity, field and reference-target names
pub fn validate_names(model: &Model, dialect: Dialect) -> ModelResult<()> {
    check_identifier("model", &model.name, dialect)?;
    for module in &model.modules {
        let local = module.name.rsplit('.').next().unwrap_or(&module.name);
        check_identifier("module", local, dialect)?;
    }
    for entity in &model.entities {
        check_identifier("entity", &entity.name, dialect)?;
        for field in &entity.fields {
            check_identifier(&format!("field of entity '{}':", entity.name), &field.name, dialect)?;
            if let Some(target) = field.xref().filter(|t| !t.entity.is_empty()) {
                check_identifier(
                    &format!("xref_entity of '{}.{}':", entity.name, field.name),
                    &target.entity,
                    dialect,
                )?;
            }
        }
    }
    Ok(())
}

fn name_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes) % 100_000
}

/// Shorten a generated identifier to fit `limit`.
///
/// Names within the limit are returned as they are. Longer names keep their
/// first `limit - 5` characters followed by a 5-digit hash of the full name.
pub fn mangle_identifier(name: &str, limit: Option<usize>) -> String {
    match limit {
        Some(limit) if limit > HASH_DIGITS && name.chars().count() > limit => {
            let prefix: String = name.chars().take(limit - HASH_DIGITS).collect();
            format!("{}{:0width$}", prefix, name_hash(name), width = HASH_DIGITS)
        }
        _ => name.to_string(),
    }
}

fn exceeds(name: &str, limit: Option<usize>) -> bool {
    limit.is_some_and(|limit| name.chars().count() > limit)
}

/// First free name of `base`, `base_mref`, `base_mref_2`, ... after mangling
pub(crate) fn free_link_name(base: &str, limit: Option<usize>, taken: &HashSet<String>) -> String {
    let mut candidate = mangle_identifier(base, limit);
    let mut attempt = 1;
    while taken.contains(&candidate) {
        let suffixed = if attempt == 1 {
            format!("{}_mref", base)
        } else {
            format!("{}_mref_{}", base, attempt)
        };
        candidate = mangle_identifier(&suffixed, limit);
        attempt += 1;
    }
    candidate
}

/// Fill in `mref_name`, `mref_localid` and `mref_remoteid` where they were not declared
pub fn assign_link_names(model: &mut Model, dialect: Dialect) -> ModelResult<()> {
    let limit = dialect.identifier_limit();
    let mut taken: HashSet<String> = model.entity_names().into_iter().collect();

    for ei in 0..model.entities.len() {
        for fi in 0..model.entities[ei].fields.len() {
            let entity_name = model.entities[ei].name.clone();
            let field = &model.entities[ei].fields[fi];
            let FieldType::Mref { target, link } = &field.field_type else {
                continue;
            };
            let context = format!("{}.{}", entity_name, field.name);
            let mut target = target.clone();
            let mut link = link.clone();

            let link_name = match link.name.take() {
                Some(name) if exceeds(&name, limit) => {
                    return Err(ModelError::constraint(format!(
                        "mref_name '{}' of {} is longer than {} characters allowed by dialect {}",
                        name,
                        context,
                        limit.unwrap_or_default(),
                        dialect
                    )));
                }
                Some(name) => {
                    taken.insert(name.clone());
                    name
                }
                None => {
                    let name = free_link_name(&format!("{}_{}", entity_name, field.name), limit, &taken);
                    debug!(field = %context, link = %name, "assigned default mref_name");
                    taken.insert(name.clone());
                    name
                }
            };

            if target.entity.is_empty() {
                target.entity = infer_target(model, &entity_name, &field.name, &link_name, link.remote_id.as_deref())
                    .ok_or_else(|| {
                        ModelError::reference(format!(
                            "mref {} has no xref_entity and link entity '{}' does not name one",
                            context, link_name
                        ))
                    })?;
            }

            let remote = link.remote_id.take().unwrap_or_else(|| target.entity.clone());
            let local = match link.local_id.take() {
                Some(local) if local == remote => {
                    return Err(ModelError::constraint(format!(
                        "mref_localid and mref_remoteid of {} are both '{}'",
                        context, local
                    )));
                }
                Some(local) => local,
                None if entity_name == remote => mangle_identifier(&format!("{}_self", entity_name), limit),
                None => entity_name.clone(),
            };
            link.name = Some(link_name);
            link.local_id = Some(local);
            link.remote_id = Some(remote);

            model.entities[ei].fields[fi].field_type = FieldType::Mref { target, link };
        }
    }
    Ok(())
}

/// Target of an mref that only names its link entity.
///
/// A declared link entity gives the target through its columns. Otherwise the
/// other side of the relation, an mref with a target naming the same link
/// entity, is owned by the target.
fn infer_target(
    model: &Model,
    owner: &str,
    field: &str,
    link_name: &str,
    remote_id: Option<&str>,
) -> Option<String> {
    if let Some(link) = model.entity(link_name) {
        let column = match remote_id {
            Some(remote) => link.field(remote),
            None => link
                .fields
                .iter()
                .find(|f| f.xref_entity().is_some_and(|e| !e.is_empty() && e != owner)),
        }?;
        return column.xref_entity().filter(|e| !e.is_empty()).map(String::from);
    }

    model.entities.iter().find_map(|entity| {
        entity
            .fields
            .iter()
            .filter(|f| !(entity.name == owner && f.name == field))
            .find(|f| {
                f.field_type.mref_link().and_then(|l| l.name.as_deref()) == Some(link_name)
                    && f.xref_entity().is_some_and(|e| !e.is_empty())
            })
            .map(|_| entity.name.clone())
    })
}

fn lowercase_path(label: &str) -> String {
    match label.split_once('.') {
        Some((entity, field)) => format!("{}.{}", entity, field.to_lowercase()),
        None => label.to_lowercase(),
    }
}

/// Lowercase every field name and rewrite all references to the new names
pub fn correct_field_case(model: &mut Model) -> ModelResult<()> {
    for entity in &mut model.entities {
        let renames: Vec<(String, String)> = entity
            .fields
            .iter()
            .filter(|f| f.name != f.name.to_lowercase())
            .map(|f| (f.name.clone(), f.name.to_lowercase()))
            .collect();
        for (old, new) in renames {
            if entity.has_field(&new) {
                return Err(ModelError::constraint(format!(
                    "fields '{}' and '{}' of entity '{}' differ only in case",
                    old, new, entity.name
                )));
            }
            debug!(entity = %entity.name, from = %old, to = %new, "lowercased field name");
            entity.rename_field(&old, &new);
        }
    }

    for field in model.entities.iter_mut().flat_map(|e| e.fields.iter_mut()) {
        if let Some(target) = field.xref_mut() {
            target.field = target.field.as_deref().map(str::to_lowercase);
            target.labels = target.labels.iter().map(|l| lowercase_path(l)).collect();
        }
    }
    Ok(())
}

/// Entity and field names must fit the dialect's identifier limit
pub fn validate_name_sizes(model: &Model, dialect: Dialect) -> ModelResult<()> {
    let Some(limit) = dialect.identifier_limit() else {
        return Ok(());
    };
    for entity in &model.entities {
        if exceeds(&entity.name, Some(limit)) {
            return Err(ModelError::constraint(format!(
                "entity name '{}' is longer than {} characters allowed by dialect {}",
                entity.name, limit, dialect
            )));
        }
        for field in &entity.fields {
            if exceeds(&field.name, Some(limit)) {
                return Err(ModelError::constraint(format!(
                    "field name '{}.{}' is longer than {} characters allowed by dialect {}",
                    entity.name, field.name, limit, dialect
                )));
            }
        }
    }
    Ok(())
}
