// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compare declarations with recorded state and decide what to change.
//!
//! Documents are compared with references left symbolic, so a resource whose
//! declaration is unchanged plans as a no-op even though the values its
//! references resolve to are only known after apply.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::levels::compute_levels;
use crate::blueprint::Stack;
use crate::errors::ExecutionError;
use crate::observability::messages::engine::PlanComputed;
use crate::observability::messages::StructuredLog;
use crate::resources::ResourceAddress;
use crate::state::StateDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoOp,
    Create,
    Update,
    /// Delete the existing resource, then create it again.
    Replace,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::NoOp => "no-op",
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
        }
    }

    /// Symbol used in human-readable plan output.
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::NoOp => " ",
            Action::Create => "+",
            Action::Update => "~",
            Action::Replace => "-/+",
            Action::Delete => "-",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedChange {
    pub address: ResourceAddress,
    pub action: Action,
    /// Top-level document fields that differ from the recorded document.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
    /// Set when the action was forced by replacing a dependency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_by: Option<ResourceAddress>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub replaces: usize,
    pub deletes: usize,
    pub unchanged: usize,
}

impl PlanSummary {
    pub fn pending(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    /// Every declared resource in level order, then every deletion.
    pub changes: Vec<PlannedChange>,
    /// Topological levels of the declared resources.
    pub levels: Vec<Vec<ResourceAddress>>,
    /// Replaced resources, and deletions that depend on one, grouped so
    /// dependents go first. The old instances are removed before anything
    /// is created.
    pub teardown_levels: Vec<Vec<ResourceAddress>>,
    /// Remaining deletions grouped so dependents go before their dependencies.
    pub deletion_levels: Vec<Vec<ResourceAddress>>,
}

impl Plan {
    pub fn get(&self, address: &ResourceAddress) -> Option<&PlannedChange> {
        self.changes.iter().find(|c| c.address == *address)
    }

    pub fn action(&self, address: &ResourceAddress) -> Action {
        self.get(address).map_or(Action::NoOp, |c| c.action)
    }

    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.action != Action::NoOp)
    }

    pub fn has_changes(&self) -> bool {
        self.pending().next().is_some()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change.action {
                Action::NoOp => summary.unchanged += 1,
                Action::Create => summary.creates += 1,
                Action::Update => summary.updates += 1,
                Action::Replace => summary.replaces += 1,
                Action::Delete => summary.deletes += 1,
            }
        }
        summary
    }

    fn log(&self) {
        let summary = self.summary();
        PlanComputed {
            creates: summary.creates,
            updates: summary.updates,
            replaces: summary.replaces,
            deletes: summary.deletes,
            unchanged: summary.unchanged,
        }
        .log();
    }
}

/// Top-level fields whose values differ, ignoring the kind tag.
fn changed_fields(recorded: &Value, declared: &Value) -> Vec<String> {
    match (recorded.as_object(), declared.as_object()) {
        (Some(old), Some(new)) => {
            let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
            keys.into_iter()
                .filter(|key| key.as_str() != "kind" && old.get(*key) != new.get(*key))
                .cloned()
                .collect()
        }
        _ if recorded != declared => vec!["document".to_string()],
        _ => Vec::new(),
    }
}

/// Recorded resources selected by `include`, dependents first.
fn reverse_levels(
    state: &StateDocument,
    include: impl Fn(&ResourceAddress) -> bool,
) -> Result<Vec<Vec<ResourceAddress>>, ExecutionError> {
    let mut levels = compute_levels(&state.dependency_graph())?;
    levels.reverse();
    Ok(levels
        .into_iter()
        .map(|level| level.into_iter().filter(|a| include(a)).collect::<Vec<_>>())
        .filter(|level| !level.is_empty())
        .collect())
}

/// `seeds` plus every recorded resource that depends on one of them,
/// directly or through another.
fn recorded_dependents(
    state: &StateDocument,
    seeds: BTreeSet<ResourceAddress>,
) -> BTreeSet<ResourceAddress> {
    let mut closure = seeds;
    loop {
        let next: Vec<ResourceAddress> = state
            .resources
            .iter()
            .filter(|(address, recorded)| {
                !closure.contains(*address)
                    && recorded.dependencies.iter().any(|d| closure.contains(d))
            })
            .map(|(address, _)| address.clone())
            .collect();
        if next.is_empty() {
            return closure;
        }
        closure.extend(next);
    }
}

pub fn plan(stack: &Stack, state: &StateDocument) -> Result<Plan, ExecutionError> {
    let graph = stack.dependency_graph()?;
    let levels = compute_levels(&graph)?;

    let mut documents = BTreeMap::new();
    for resource in stack.iter() {
        documents.insert(&resource.address, resource.document()?);
    }

    let mut changes = Vec::with_capacity(stack.len());
    for address in levels.iter().flatten() {
        let declared = documents.get(address).ok_or_else(|| ExecutionError::InternalError {
            message: format!("'{}' is in the graph but not declared", address),
        })?;

        let Some(recorded) = state.get(address) else {
            changes.push(PlannedChange {
                address: address.clone(),
                action: Action::Create,
                changed_fields: Vec::new(),
                forced_by: None,
            });
            continue;
        };

        let replace_on = address.kind.replace_on();
        let fields = changed_fields(&recorded.document, declared);
        let action = if fields.iter().any(|f| replace_on.contains(&f.as_str())) {
            Action::Replace
        } else if fields.is_empty() {
            Action::NoOp
        } else {
            Action::Update
        };
        changes.push(PlannedChange {
            address: address.clone(),
            action,
            changed_fields: fields,
            forced_by: None,
        });
    }

    // An existing instance keeps referring to whatever it was created
    // against, so it has to go before that resource can be removed. Anything
    // recorded as depending on a replaced resource is replaced as well, or
    // deleted early when it is no longer declared.
    let replaced = changes
        .iter()
        .filter(|c| c.action == Action::Replace)
        .map(|c| c.address.clone())
        .collect();
    let doomed = recorded_dependents(state, replaced);
    for change in changes.iter_mut() {
        if change.action == Action::Replace || !doomed.contains(&change.address) {
            continue;
        }
        change.action = Action::Replace;
        change.forced_by = state.get(&change.address).and_then(|recorded| {
            recorded
                .dependencies
                .iter()
                .find(|d| doomed.contains(*d))
                .cloned()
        });
    }

    let teardown_levels = reverse_levels(state, |a| doomed.contains(a))?;
    let deletion_levels =
        reverse_levels(state, |a| !documents.contains_key(a) && !doomed.contains(a))?;
    for address in teardown_levels.iter().chain(&deletion_levels).flatten() {
        if documents.contains_key(address) {
            continue;
        }
        changes.push(PlannedChange {
            address: address.clone(),
            action: Action::Delete,
            changed_fields: Vec::new(),
            forced_by: None,
        });
    }

    let plan = Plan {
        changes,
        levels,
        teardown_levels,
        deletion_levels,
    };
    plan.log();
    Ok(plan)
}

/// Delete everything recorded.
pub fn plan_destroy(state: &StateDocument) -> Result<Plan, ExecutionError> {
    let deletion_levels = reverse_levels(state, |_| true)?;
    let plan = Plan {
        changes: deletion_levels
            .iter()
            .flatten()
            .map(|address| PlannedChange {
                address: address.clone(),
                action: Action::Delete,
                changed_fields: Vec::new(),
                forced_by: None,
            })
            .collect(),
        levels: Vec::new(),
        teardown_levels: Vec::new(),
        deletion_levels,
    };
    plan.log();
    Ok(plan)
}
