// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::DependencyGraph;
use crate::errors::StateError;
use crate::resources::{ResourceAddress, ResourceKind};
use crate::traits::Outputs;

pub const FORMAT_VERSION: u32 = 1;

/// One applied resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub kind: ResourceKind,
    /// The declared document with references left symbolic, so re-planning
    /// compares declarations rather than resolved values.
    pub document: Value,
    #[serde(default)]
    pub dependencies: Vec<ResourceAddress>,
    #[serde(default)]
    pub outputs: Outputs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub format_version: u32,
    pub serial: u64,
    /// Lock id of the backend this document belongs to.
    pub backend: String,
    #[serde(default)]
    pub resources: BTreeMap<ResourceAddress, ResourceState>,
}

impl StateDocument {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            serial: 0,
            backend: backend.into(),
            resources: BTreeMap::new(),
        }
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    pub fn outputs(&self, address: &ResourceAddress) -> Option<&Outputs> {
        self.resources.get(address).map(|r| &r.outputs)
    }

    pub fn insert(&mut self, address: ResourceAddress, state: ResourceState) {
        self.resources.insert(address, state);
    }

    pub fn remove(&mut self, address: &ResourceAddress) -> Option<ResourceState> {
        self.resources.remove(address)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Dependency graph of the recorded resources, from their stored edges.
    ///
    /// Edges to addresses no longer recorded are dropped.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_dependencies(
            self.resources
                .iter()
                .map(|(address, state)| (address, state.dependencies.as_slice())),
        )
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize this document at the next serial and hand it to `write`.
    /// The serial only advances once `write` succeeds.
    pub fn commit_next<F>(&mut self, write: F) -> Result<(), StateError>
    where
        F: FnOnce(&str) -> Result<(), StateError>,
    {
        let next = self.serial + 1;
        let mut staged = serde_json::to_value(&*self)?;
        staged["serial"] = Value::from(next);
        write(&serde_json::to_string_pretty(&staged)?)?;
        self.serial = next;
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, StateError> {
        let document: Self = serde_json::from_str(text)?;
        if document.format_version != FORMAT_VERSION {
            return Err(StateError::UnsupportedVersion(document.format_version));
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(kind: ResourceKind, dependencies: Vec<ResourceAddress>) -> ResourceState {
        ResourceState {
            kind,
            document: json!({"kind": kind.as_str()}),
            dependencies,
            outputs: Outputs::from([("id".to_string(), "x-1".to_string())]),
        }
    }

    #[test]
    fn json_keys_are_addresses() {
        let mut doc = StateDocument::new("corrgraph-tfstate/infra/terraform.tfstate");
        let vpc = ResourceAddress::new(ResourceKind::Vpc, "main");
        doc.insert(vpc.clone(), entry(ResourceKind::Vpc, vec![]));

        let text = doc.to_json().unwrap();
        assert!(text.contains("\"vpc.main\""));
        let parsed = StateDocument::from_json(&text).unwrap();
        assert_eq!(parsed.outputs(&vpc).unwrap()["id"], "x-1");
    }

    #[test]
    fn serial_advances_only_after_a_successful_write() {
        let mut doc = StateDocument::new("b/k");
        let failed = doc.commit_next(|_| {
            Err(StateError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only bucket",
            )))
        });
        assert!(failed.is_err());
        assert_eq!(doc.serial, 0);

        let mut written = String::new();
        doc.commit_next(|json| {
            written = json.to_string();
            Ok(())
        })
        .unwrap();
        assert_eq!(doc.serial, 1);
        assert_eq!(StateDocument::from_json(&written).unwrap(), doc);
    }

    #[test]
    fn rejects_unknown_format_version() {
        let text = r#"{"format_version": 7, "serial": 1, "backend": "b/k"}"#;
        assert!(matches!(
            StateDocument::from_json(text),
            Err(StateError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn graph_drops_edges_to_forgotten_resources() {
        let vpc = ResourceAddress::new(ResourceKind::Vpc, "main");
        let subnet = ResourceAddress::new(ResourceKind::Subnet, "public");
        let gone = ResourceAddress::new(ResourceKind::InternetGateway, "main");

        let mut doc = StateDocument::new("b/k");
        doc.insert(vpc.clone(), entry(ResourceKind::Vpc, vec![]));
        doc.insert(subnet.clone(), entry(ResourceKind::Subnet, vec![vpc.clone(), gone]));

        let graph = doc.dependency_graph();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get_dependents(&vpc), Some(&vec![subnet]));
    }
}
