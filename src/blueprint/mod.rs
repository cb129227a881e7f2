// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Derives the full resource graph of the pipeline from a [`StackConfig`].
//!
//! Each layer lives in its own module and only names the resources of other
//! layers through [`Reference`]s built from [`names`], so layers can be read
//! (and tested) independently. Ordering is never hard-coded here: the engine
//! derives it from the references.

mod access;
mod analytics;
mod compute;
mod graph_db;
mod identity;
mod invariants;
pub mod names;
mod network;
mod scheduling;
mod storage;
mod visualization;

pub use invariants::check_invariants;

use crate::config::{validate_dependency_graph, DependencyGraph, StackConfig};
use crate::errors::ValidationError;
use crate::resources::{Reference, Resource, ResourceAddress, ResourceKind};

/// The ordered set of resources declared for one configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    resources: Vec<Resource>,
}

impl Stack {
    pub fn from_config(config: &StackConfig) -> Self {
        let mut resources = Vec::new();
        resources.extend(network::declare(config));
        resources.extend(access::declare(config));
        resources.extend(identity::declare(config));
        resources.extend(storage::declare(config));
        resources.extend(graph_db::declare(config));
        resources.extend(compute::declare(config));
        resources.extend(scheduling::declare(config));
        resources.extend(analytics::declare(config));
        resources.extend(visualization::declare(config));
        Self { resources }
    }

    pub fn from_resources(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&Resource> {
        self.resources.iter().find(|r| r.address == *address)
    }

    pub fn get_mut(&mut self, address: &ResourceAddress) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.address == *address)
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn remove(&mut self, address: &ResourceAddress) -> Option<Resource> {
        let index = self.resources.iter().position(|r| r.address == *address)?;
        Some(self.resources.remove(index))
    }

    /// Duplicate, unresolved-reference and cycle checks over the declarations.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        validate_dependency_graph(&self.resources)
    }

    pub fn dependency_graph(&self) -> Result<DependencyGraph, serde_json::Error> {
        DependencyGraph::from_resources(&self.resources)
    }
}

/// Shorthand for `${kind.name.attribute}`.
pub(crate) fn reference(kind: ResourceKind, name: &str, attribute: &str) -> Reference {
    Reference::to(&ResourceAddress::new(kind, name), attribute)
}

pub(crate) fn address(kind: ResourceKind, name: &str) -> ResourceAddress {
    ResourceAddress::new(kind, name)
}

/// Project tags plus a `Name` tag.
pub(crate) fn named_tags(config: &StackConfig, name: &str) -> std::collections::BTreeMap<String, String> {
    let mut tags = config.tags();
    tags.insert("Name".to_string(), format!("{}-{}", config.name_prefix(), name));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::minimal_config;

    #[test]
    fn minimal_config_declares_every_layer() {
        let stack = Stack::from_config(&minimal_config());
        for kind in ResourceKind::ALL {
            let expected = if kind == ResourceKind::ContainerRepository { 0 } else { 1 };
            assert!(
                stack.of_kind(kind).count() >= expected,
                "no {} declared",
                kind
            );
        }
        assert!(stack.validate().is_ok(), "{:?}", stack.validate());
    }

    #[test]
    fn addresses_are_unique_and_stable() {
        let config = minimal_config();
        let first = Stack::from_config(&config);
        let second = Stack::from_config(&config);
        assert_eq!(first, second);

        let mut addresses: Vec<String> = first.iter().map(|r| r.address.to_string()).collect();
        let total = addresses.len();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), total);
    }

    #[test]
    fn remove_and_get() {
        let mut stack = Stack::from_config(&minimal_config());
        let bastion = address(ResourceKind::BastionHost, names::MAIN);
        assert!(stack.get(&bastion).is_some());
        let removed = stack.remove(&bastion).unwrap();
        assert_eq!(removed.address, bastion);
        assert!(stack.get(&bastion).is_none());
        assert!(stack.remove(&bastion).is_none());
    }

    #[test]
    fn dependency_graph_covers_every_resource() {
        let stack = Stack::from_config(&minimal_config());
        let graph = stack.dependency_graph().unwrap();
        assert_eq!(graph.len(), stack.len());

        let entry_points: Vec<ResourceAddress> = graph.entry_points().into();
        assert!(entry_points.contains(&address(ResourceKind::Vpc, names::MAIN)));
        assert!(entry_points.contains(&address(ResourceKind::Bucket, names::RAW)));
        assert!(!entry_points.contains(&address(ResourceKind::Function, names::ETL)));
    }
}
