//! Dependency graph over derived fields
//!
//! A derived field depends on its declared parents and on every field its
//! expression references. Only derived fields have outgoing edges, so a
//! cycle always runs through derived fields alone.

use std::collections::{BTreeMap, BTreeSet};

use super::types::FormSchema;
use crate::expression::Expression;

impl FormSchema {
    /// Direct dependencies of every derived field, keyed by field id.
    ///
    /// References to ids that are not fields of this schema are dropped.
    pub fn dependencies(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let known: BTreeSet<&str> = self.fields.iter().map(|f| f.id.as_str()).collect();

        self.derived_fields()
            .map(|field| {
                let mut deps: BTreeSet<&str> = field
                    .parents()
                    .iter()
                    .map(String::as_str)
                    .filter(|id| known.contains(id))
                    .collect();

                if let Some(Ok(expr)) = field.derived_expression().map(Expression::parse) {
                    for name in expr.references() {
                        if let Some(id) = known.get(name.as_str()) {
                            deps.insert(*id);
                        }
                    }
                }

                (field.id.as_str(), deps)
            })
            .collect()
    }

    /// Finds a dependency cycle among derived fields.
    ///
    /// Returns the field ids along the cycle, starting and ending with the
    /// same id, or `None` if the derived fields form a DAG. Search order
    /// follows field declaration order, so the result is deterministic.
    pub fn dependency_cycle(&self) -> Option<Vec<String>> {
        let deps = self.dependencies();
        let mut state: BTreeMap<&str, Visit> = BTreeMap::new();
        let mut path: Vec<&str> = Vec::new();

        for field in self.derived_fields() {
            if let Some(cycle) = visit(field.id.as_str(), &deps, &mut state, &mut path) {
                return Some(cycle);
            }
        }
        None
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

fn visit<'a>(
    node: &'a str,
    deps: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    state: &mut BTreeMap<&'a str, Visit>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    match state.get(node) {
        Some(Visit::Done) => return None,
        Some(Visit::InProgress) => {
            let start = path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        None => {}
    }

    state.insert(node, Visit::InProgress);
    path.push(node);

    if let Some(next) = deps.get(node) {
        for dep in next {
            if let Some(cycle) = visit(*dep, deps, state, path) {
                return Some(cycle);
            }
        }
    }

    path.pop();
    state.insert(node, Visit::Done);
    None
}
