// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::config::DependencyGraph;
use crate::errors::ExecutionError;
use crate::observability::messages::engine::LevelComputationCompleted;
use crate::observability::messages::StructuredLog;
use crate::resources::ResourceAddress;

/// Group the graph into topological levels with Kahn's algorithm.
///
/// Level 0 holds the entry points; every resource in level N depends only on
/// resources in levels below N, so a whole level can be applied concurrently.
/// Addresses within a level are sorted, which keeps plans reproducible.
///
/// Cycles are rejected during validation, so finding one here is reported as
/// an internal error.
pub fn compute_levels(graph: &DependencyGraph) -> Result<Vec<Vec<ResourceAddress>>, ExecutionError> {
    if graph.is_empty() {
        return Ok(Vec::new());
    }

    let reverse_deps = graph.build_reverse_dependencies();
    let mut in_degree: BTreeMap<&ResourceAddress, usize> = reverse_deps
        .iter()
        .map(|(address, dependencies)| (address, dependencies.len()))
        .collect();

    let mut current: Vec<ResourceAddress> = graph.entry_points().into();
    current.sort();
    if current.is_empty() {
        return Err(ExecutionError::InternalError {
            message: "no entry points found, every resource has a dependency".into(),
        });
    }

    let mut processed: BTreeSet<ResourceAddress> = current.iter().cloned().collect();
    let mut queue: VecDeque<ResourceAddress> = current.iter().cloned().collect();
    let mut levels = vec![current];

    while !queue.is_empty() {
        let mut next_level = Vec::new();
        for _ in 0..queue.len() {
            let Some(address) = queue.pop_front() else {
                break;
            };
            for dependent in graph.get_dependents(&address).into_iter().flatten() {
                if processed.contains(dependent) {
                    continue;
                }
                let remaining = in_degree.get_mut(dependent).ok_or_else(|| {
                    ExecutionError::InternalError {
                        message: format!("'{}' missing from in-degree map", dependent),
                    }
                })?;
                *remaining -= 1;
                if *remaining == 0 {
                    next_level.push(dependent.clone());
                    processed.insert(dependent.clone());
                }
            }
        }

        next_level.sort();
        queue.extend(next_level.iter().cloned());
        if !next_level.is_empty() {
            levels.push(next_level);
        }
    }

    if processed.len() != graph.len() {
        return Err(ExecutionError::InternalError {
            message: "dependency graph contains a cycle that validation did not catch".into(),
        });
    }

    LevelComputationCompleted {
        level_count: levels.len(),
        resource_count: processed.len(),
    }
    .log();

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::Stack;
    use crate::config::minimal_config;
    use crate::resources::ResourceKind;

    fn addr(kind: ResourceKind, name: &str) -> ResourceAddress {
        ResourceAddress::new(kind, name)
    }

    fn level_of(levels: &[Vec<ResourceAddress>], address: &ResourceAddress) -> usize {
        levels.iter().position(|l| l.contains(address)).unwrap()
    }

    #[test]
    fn diamond_resolves_into_three_levels() {
        let vpc = addr(ResourceKind::Vpc, "main");
        let a = addr(ResourceKind::Subnet, "a");
        let b = addr(ResourceKind::Subnet, "b");
        let group = addr(ResourceKind::GraphSubnetGroup, "main");

        let graph = DependencyGraph::from(BTreeMap::from([
            (vpc.clone(), vec![a.clone(), b.clone()]),
            (a.clone(), vec![group.clone()]),
            (b.clone(), vec![group.clone()]),
            (group.clone(), vec![]),
        ]));

        let levels = compute_levels(&graph).unwrap();
        assert_eq!(levels, vec![vec![vpc], vec![a, b], vec![group]]);
    }

    #[test]
    fn cycle_is_an_internal_error() {
        let a = addr(ResourceKind::Subnet, "a");
        let b = addr(ResourceKind::Subnet, "b");
        let c = addr(ResourceKind::Vpc, "c");
        let graph = DependencyGraph::from(BTreeMap::from([
            (c.clone(), vec![a.clone()]),
            (a.clone(), vec![b.clone()]),
            (b.clone(), vec![a.clone()]),
        ]));
        assert!(matches!(
            compute_levels(&graph),
            Err(ExecutionError::InternalError { .. })
        ));
    }

    #[test]
    fn stack_levels_respect_references() {
        let stack = Stack::from_config(&minimal_config());
        let graph = stack.dependency_graph().unwrap();
        let levels = compute_levels(&graph).unwrap();
        assert_eq!(levels.iter().map(Vec::len).sum::<usize>(), stack.len());

        let vpc = addr(ResourceKind::Vpc, "main");
        let cluster = addr(ResourceKind::GraphCluster, "main");
        let etl = addr(ResourceKind::Function, "etl");
        let target = addr(ResourceKind::ScheduleTarget, "etl");
        assert_eq!(level_of(&levels, &vpc), 0);
        assert!(level_of(&levels, &cluster) < level_of(&levels, &etl));
        assert!(level_of(&levels, &etl) < level_of(&levels, &target));
    }

    #[test]
    fn empty_graph_has_no_levels() {
        assert!(compute_levels(&DependencyGraph::new()).unwrap().is_empty());
    }
}
