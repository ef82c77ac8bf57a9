//! Dependency ordering of entities
//!
//! An entity depends on the targets of its xref/mref fields (and on their
//! descendants, since a row may live in a subclass table) and on its
//! ancestors. Entities are emitted once everything they depend on has been
//! emitted. Entities caught in a cycle are appended in model order and
//! reported as a warning.

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

use crate::error::{StructuralWarning, WarningKind};
use crate::models::Model;

/// Result of ordering the entities of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOrder {
    /// Entity names, dependencies first
    pub order: Vec<String>,
    /// Set when some entities could not be placed
    pub cycle_warning: Option<StructuralWarning>,
}

/// Orders entities so that referenced entities come first
pub struct DependencyOrderer<'a> {
    model: &'a Model,
}

impl<'a> DependencyOrderer<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Concrete entities `name` depends on, excluding itself
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        let model = self.model;
        let mut deps: Vec<String> = Vec::new();
        let mut push = |candidate: &str| {
            let concrete = model.entity(candidate).is_some_and(|e| !e.is_abstract);
            if concrete && candidate != name && !deps.iter().any(|d| d == candidate) {
                deps.push(candidate.to_string());
            }
        };

        for field in model.all_fields(name) {
            let Some(target) = field.xref_entity() else {
                continue;
            };
            push(target);
            for descendant in model.descendants(target) {
                push(&descendant.name);
            }
        }
        for ancestor in model.ancestors(name) {
            push(&ancestor.name);
        }
        deps
    }

    /// Emit every entity after its dependencies
    pub fn order(&self) -> DependencyOrder {
        let names = self.model.entity_names();
        let deps: HashMap<String, Vec<String>> = names
            .iter()
            .map(|name| (name.clone(), self.dependencies(name)))
            .collect();

        let mut placed: HashSet<String> = HashSet::new();
        let mut order: Vec<String> = Vec::new();
        let mut remaining: Vec<String> = names.clone();

        while let Some(position) = remaining.iter().position(|name| {
            deps.get(name)
                .is_none_or(|d| d.iter().all(|dep| placed.contains(dep)))
        }) {
            let name = remaining.remove(position);
            debug!(entity = %name, "placed entity");
            placed.insert(name.clone());
            order.push(name);
        }

        if remaining.is_empty() {
            return DependencyOrder {
                order,
                cycle_warning: None,
            };
        }

        let mut unmet = Vec::new();
        for name in &remaining {
            let missing: Vec<&str> = deps
                .get(name)
                .map(|d| {
                    d.iter()
                        .filter(|dep| !placed.contains(*dep))
                        .map(String::as_str)
                        .collect()
                })
                .unwrap_or_default();
            error!(entity = %name, unmet = ?missing, "entity depends on unplaced entities");
            unmet.push(format!("{} -> [{}]", name, missing.join(", ")));
        }
        let groups = self.cycle_groups(&remaining, &deps);
        let message = format!(
            "dependency cycle, appended in model order: {}; cycles: {}",
            unmet.join("; "),
            groups
                .iter()
                .map(|g| format!("[{}]", g.join(", ")))
                .collect::<Vec<_>>()
                .join(" ")
        );
        order.extend(remaining);

        DependencyOrder {
            order,
            cycle_warning: Some(StructuralWarning::new(WarningKind::DependencyCycle, message)),
        }
    }

    /// Strongly connected groups among the unplaced entities
    fn cycle_groups(&self, remaining: &[String], deps: &HashMap<String, Vec<String>>) -> Vec<Vec<String>> {
        let mut graph = Graph::<String, (), Directed>::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        for name in remaining {
            nodes.insert(name.as_str(), graph.add_node(name.clone()));
        }
        for name in remaining {
            for dep in deps.get(name).into_iter().flatten() {
                if let (Some(&from), Some(&to)) = (nodes.get(name.as_str()), nodes.get(dep.as_str())) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let position = |name: &str| remaining.iter().position(|r| r == name).unwrap_or(usize::MAX);
        let mut groups: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .iter()
                        .any(|&n| graph.contains_edge(n, n))
            })
            .map(|component| {
                let mut names: Vec<String> =
                    component.into_iter().map(|n| graph[n].clone()).collect();
                names.sort_by_key(|n| position(n.as_str()));
                names
            })
            .collect();
        groups.sort_by_key(|g| g.first().map(|n| position(n.as_str())).unwrap_or(usize::MAX));
        groups
    }
}
