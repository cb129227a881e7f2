// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::config::EntryPoints;
use crate::resources::{Resource, ResourceAddress};

/// Newtype over the forward edges of a resource graph: each address maps to
/// the addresses that depend on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph(pub BTreeMap<ResourceAddress, Vec<ResourceAddress>>);

impl DependencyGraph {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build the forward graph from declared resources. Edges to undeclared
    /// addresses are dropped; graph validation reports those separately.
    pub fn from_resources(resources: &[Resource]) -> Result<Self, serde_json::Error> {
        let mut graph = Self::new();
        for resource in resources {
            graph.0.entry(resource.address.clone()).or_default();
        }
        for resource in resources {
            for dependency in resource.dependencies()? {
                if let Some(dependents) = graph.0.get_mut(&dependency) {
                    dependents.push(resource.address.clone());
                }
            }
        }
        Ok(graph)
    }

    /// Build from recorded `(address, dependencies)` pairs, e.g. from state.
    pub fn from_dependencies<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a ResourceAddress, &'a [ResourceAddress])>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let mut graph = Self::new();
        for (address, _) in &entries {
            graph.0.entry((*address).clone()).or_default();
        }
        for (address, dependencies) in &entries {
            for dependency in dependencies.iter() {
                if let Some(dependents) = graph.0.get_mut(dependency) {
                    dependents.push((*address).clone());
                }
            }
        }
        graph
    }

    pub fn add_dependency(&mut self, address: ResourceAddress, dependents: Vec<ResourceAddress>) {
        self.0.insert(address, dependents);
    }

    pub fn get_dependents(&self, address: &ResourceAddress) -> Option<&Vec<ResourceAddress>> {
        self.0.get(address)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceAddress> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Dependent -> dependencies view of the same edges.
    pub fn build_reverse_dependencies(&self) -> BTreeMap<ResourceAddress, Vec<ResourceAddress>> {
        let mut reverse: BTreeMap<ResourceAddress, Vec<ResourceAddress>> =
            self.0.keys().map(|k| (k.clone(), Vec::new())).collect();
        for (dependency, dependents) in &self.0 {
            for dependent in dependents {
                reverse
                    .entry(dependent.clone())
                    .or_default()
                    .push(dependency.clone());
            }
        }
        reverse
    }

    /// Addresses with no dependencies at all.
    pub fn entry_points(&self) -> EntryPoints {
        self.build_reverse_dependencies()
            .into_iter()
            .filter(|(_, dependencies)| dependencies.is_empty())
            .map(|(address, _)| address)
            .collect::<Vec<_>>()
            .into()
    }

    /// Every address that transitively depends on `address`, excluding itself.
    pub fn transitive_dependents(&self, address: &ResourceAddress) -> Vec<ResourceAddress> {
        let mut seen = std::collections::BTreeSet::new();
        let mut stack = vec![address.clone()];
        while let Some(current) = stack.pop() {
            for dependent in self.0.get(&current).into_iter().flatten() {
                if seen.insert(dependent.clone()) {
                    stack.push(dependent.clone());
                }
            }
        }
        seen.remove(address);
        seen.into_iter().collect()
    }
}

impl From<BTreeMap<ResourceAddress, Vec<ResourceAddress>>> for DependencyGraph {
    fn from(graph: BTreeMap<ResourceAddress, Vec<ResourceAddress>>) -> Self {
        Self(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceKind;

    fn addr(name: &str) -> ResourceAddress {
        ResourceAddress::new(ResourceKind::Subnet, name)
    }

    fn chain() -> DependencyGraph {
        // a -> b -> c, a -> c
        let mut graph = DependencyGraph::new();
        graph.add_dependency(addr("a"), vec![addr("b"), addr("c")]);
        graph.add_dependency(addr("b"), vec![addr("c")]);
        graph.add_dependency(addr("c"), vec![]);
        graph
    }

    #[test]
    fn reverse_dependencies_invert_edges() {
        let reverse = chain().build_reverse_dependencies();
        assert!(reverse[&addr("a")].is_empty());
        assert_eq!(reverse[&addr("c")], vec![addr("a"), addr("b")]);
    }

    #[test]
    fn entry_points_have_no_dependencies() {
        let entry_points: Vec<ResourceAddress> = chain().entry_points().into();
        assert_eq!(entry_points, vec![addr("a")]);
    }

    #[test]
    fn transitive_dependents_walk_the_graph() {
        let graph = chain();
        assert_eq!(graph.transitive_dependents(&addr("a")), vec![addr("b"), addr("c")]);
        assert!(graph.transitive_dependents(&addr("c")).is_empty());
    }

    #[test]
    fn from_dependencies_ignores_unknown_addresses() {
        let a = addr("a");
        let b = addr("b");
        let b_deps = vec![a.clone(), addr("ghost")];
        let graph = DependencyGraph::from_dependencies(vec![
            (&a, &[][..]),
            (&b, b_deps.as_slice()),
        ]);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get_dependents(&a), Some(&vec![b.clone()]));
    }
}
