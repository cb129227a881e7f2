// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validation of stack configurations and of the resource graph derived from them.
//!
//! Two passes run at different times:
//!
//! 1. [`validate_stack_config`] checks field-level rules on the loaded
//!    configuration: zones, address blocks, bucket names, ranges and the
//!    schedule expression. It runs before any resource is derived.
//! 2. [`validate_dependency_graph`] checks the derived resources:
//!    - **Uniqueness**: every address is declared once
//!    - **References**: every `${kind.name.attr}` and `depends_on` entry names a declared address
//!    - **Cycles**: DFS with a recursion stack, reporting the cycle path
//!
//! Cycle detection only runs when the first two checks pass, since it needs a
//! structurally valid graph.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::cidr::Ipv4Cidr;
use crate::config::consts::{
    MAX_MEMORY_MB, MAX_TIMEOUT_SECONDS, MIN_DATABASE_ZONES, MIN_MEMORY_MB,
};
use crate::config::{PackagingConfig, StackConfig};
use crate::errors::ValidationError;
use crate::resources::{Resource, ResourceAddress};
use crate::schedule::RateExpression;

/// Table names the analytics layer knows how to derive.
const KNOWN_TABLES: [&str; 2] = ["nodes", "edges"];

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Check field-level rules of a loaded configuration, accumulating every error.
pub fn validate_stack_config(config: &StackConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_valid_label(&config.project) {
        errors.push(invalid(
            "project",
            "must be non-empty lowercase letters, digits and hyphens",
        ));
    }
    if !is_valid_label(&config.environment) {
        errors.push(invalid(
            "environment",
            "must be non-empty lowercase letters, digits and hyphens",
        ));
    }

    validate_network(config, &mut errors);
    validate_buckets(config, &mut errors);
    validate_compute(config, &mut errors);

    if let Err(reason) = config.schedule.expression.parse::<RateExpression>() {
        errors.push(invalid("schedule.expression", reason.to_string()));
    }
    if config.graph_database.port == 0 {
        errors.push(invalid("graph_database.port", "must be non-zero"));
    }
    if config.bastion.ami.trim().is_empty() {
        errors.push(invalid("bastion.ami", "must not be empty"));
    }
    if let Err(reason) = config.bastion.management_cidr.parse::<Ipv4Cidr>() {
        errors.push(invalid("bastion.management_cidr", reason));
    }
    for table in config.analytics.tables.keys() {
        if !KNOWN_TABLES.contains(&table.as_str()) {
            errors.push(invalid(
                format!("analytics.tables.{}", table),
                format!("unknown table, expected one of {}", KNOWN_TABLES.join(", ")),
            ));
        }
    }
    if config.executor_options.max_concurrency == Some(0) {
        errors.push(invalid("executor_options.max_concurrency", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_label(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn validate_network(config: &StackConfig, errors: &mut Vec<ValidationError>) {
    let network = &config.network;

    let distinct_zones: BTreeSet<&String> = network.availability_zones.iter().collect();
    if distinct_zones.len() < MIN_DATABASE_ZONES {
        errors.push(invalid(
            "network.availability_zones",
            format!(
                "at least {} distinct zones are required, found {}",
                MIN_DATABASE_ZONES,
                distinct_zones.len()
            ),
        ));
    }
    if network.private_subnet_cidrs.len() != network.availability_zones.len() {
        errors.push(invalid(
            "network.private_subnet_cidrs",
            format!(
                "expected one block per availability zone ({}), found {}",
                network.availability_zones.len(),
                network.private_subnet_cidrs.len()
            ),
        ));
    }

    let vpc = match network.cidr_block.parse::<Ipv4Cidr>() {
        Ok(vpc) => Some(vpc),
        Err(reason) => {
            errors.push(invalid("network.cidr_block", reason));
            None
        }
    };

    let mut subnets: Vec<(String, Ipv4Cidr)> = Vec::new();
    let named = std::iter::once(("network.public_subnet_cidr".to_string(), &network.public_subnet_cidr))
        .chain(
            network
                .private_subnet_cidrs
                .iter()
                .enumerate()
                .map(|(i, cidr)| (format!("network.private_subnet_cidrs[{}]", i), cidr)),
        );
    for (field, raw) in named {
        match raw.parse::<Ipv4Cidr>() {
            Ok(cidr) => {
                if let Some(vpc) = vpc {
                    if !vpc.contains(&cidr) {
                        errors.push(invalid(
                            field.clone(),
                            format!("{} is outside the VPC block {}", cidr, vpc),
                        ));
                    }
                }
                if let Some((other, _)) = subnets.iter().find(|(_, seen)| seen.overlaps(&cidr)) {
                    errors.push(invalid(field.clone(), format!("{} overlaps {}", cidr, other)));
                }
                subnets.push((field, cidr));
            }
            Err(reason) => errors.push(invalid(field, reason)),
        }
    }
}

fn validate_buckets(config: &StackConfig, errors: &mut Vec<ValidationError>) {
    let buckets = [
        ("storage.raw_bucket", &config.storage.raw_bucket),
        ("storage.analysis_bucket", &config.storage.analysis_bucket),
        ("storage.signals_bucket", &config.storage.signals_bucket),
        ("backend.bucket", &config.backend.bucket),
    ];

    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for (field, name) in buckets {
        if let Err(reason) = check_bucket_name(name) {
            errors.push(invalid(field, reason));
        }
        if let Some(first) = seen.insert(name.as_str(), field) {
            errors.push(invalid(field, format!("bucket name '{}' is already used by {}", name, first)));
        }
    }
}

/// Bucket naming rules of the object store: 3-63 characters, lowercase
/// letters, digits, dots and hyphens, starting and ending alphanumeric.
fn check_bucket_name(name: &str) -> Result<(), String> {
    if !(3..=63).contains(&name.len()) {
        return Err(format!("'{}' must be 3 to 63 characters long", name));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(format!(
            "'{}' may only contain lowercase letters, digits, dots and hyphens",
            name
        ));
    }
    let edges_alphanumeric = name
        .chars()
        .next()
        .into_iter()
        .chain(name.chars().last())
        .all(|c| c.is_ascii_alphanumeric());
    if !edges_alphanumeric {
        return Err(format!("'{}' must start and end with a letter or digit", name));
    }
    if name.contains("..") {
        return Err(format!("'{}' must not contain consecutive dots", name));
    }
    Ok(())
}

fn validate_compute(config: &StackConfig, errors: &mut Vec<ValidationError>) {
    let compute = &config.compute;
    if !(MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&compute.memory_mb) {
        errors.push(invalid(
            "compute.memory_mb",
            format!(
                "{} is outside {}..={}",
                compute.memory_mb, MIN_MEMORY_MB, MAX_MEMORY_MB
            ),
        ));
    }
    if !(1..=MAX_TIMEOUT_SECONDS).contains(&compute.timeout_seconds) {
        errors.push(invalid(
            "compute.timeout_seconds",
            format!(
                "{} is outside 1..={}",
                compute.timeout_seconds, MAX_TIMEOUT_SECONDS
            ),
        ));
    }

    match &compute.packaging {
        PackagingConfig::Archive {
            handler,
            archive_path,
            ..
        } => {
            if handler.trim().is_empty() {
                errors.push(invalid("compute.packaging.handler", "must not be empty"));
            }
            if archive_path.trim().is_empty() {
                errors.push(invalid("compute.packaging.archive_path", "must not be empty"));
            }
        }
        PackagingConfig::Container {
            repository,
            image_tag,
        } => {
            if repository.as_deref().is_some_and(|r| r.trim().is_empty()) {
                errors.push(invalid("compute.packaging.repository", "must not be empty"));
            }
            if image_tag.trim().is_empty() {
                errors.push(invalid("compute.packaging.image_tag", "must not be empty"));
            }
        }
    }
}

/// Validate the derived resource graph: unique addresses, resolvable
/// references, no cycles. All errors found are returned together, except
/// that cycle detection is skipped while reference errors remain.
pub fn validate_dependency_graph(resources: &[Resource]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(duplicate_errors) = validate_unique_addresses(resources) {
        errors.extend(duplicate_errors);
    }

    if let Err(unresolved_errors) = validate_references(resources) {
        errors.extend(unresolved_errors);
    }

    if errors.is_empty() {
        if let Err(cycle_errors) = validate_acyclic_graph(resources) {
            errors.extend(cycle_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_addresses(resources: &[Resource]) -> Result<(), Vec<ValidationError>> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for resource in resources {
        if !seen.insert(&resource.address) {
            errors.push(ValidationError::DuplicateAddress {
                address: resource.address.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn dependencies_of(resource: &Resource) -> Vec<ResourceAddress> {
    // A body that cannot serialize has no discoverable references; keep the explicit ones.
    resource
        .dependencies()
        .unwrap_or_else(|_| resource.depends_on.clone())
}

fn validate_references(resources: &[Resource]) -> Result<(), Vec<ValidationError>> {
    let declared: HashSet<&ResourceAddress> = resources.iter().map(|r| &r.address).collect();
    let mut errors = Vec::new();

    for resource in resources {
        for dependency in dependencies_of(resource) {
            if !declared.contains(&dependency) {
                errors.push(ValidationError::UnresolvedReference {
                    address: resource.address.to_string(),
                    missing: dependency.to_string(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_acyclic_graph(resources: &[Resource]) -> Result<(), Vec<ValidationError>> {
    // Forward adjacency: dependency -> dependents
    let mut graph: BTreeMap<ResourceAddress, Vec<ResourceAddress>> = resources
        .iter()
        .map(|r| (r.address.clone(), Vec::new()))
        .collect();

    for resource in resources {
        for dependency in dependencies_of(resource) {
            if let Some(dependents) = graph.get_mut(&dependency) {
                dependents.push(resource.address.clone());
            }
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for address in graph.keys() {
        if !visited.contains(address) {
            if let Some(cycle) =
                dfs_cycle_detection(address, &graph, &mut visited, &mut rec_stack, &mut path)
            {
                return Err(vec![ValidationError::CyclicDependency { cycle }]);
            }
        }
    }

    Ok(())
}

/// Depth-first search tracking the current path; a back edge to a node still
/// on the recursion stack closes a cycle, returned as `a -> b -> ... -> a`.
fn dfs_cycle_detection(
    node: &ResourceAddress,
    graph: &BTreeMap<ResourceAddress, Vec<ResourceAddress>>,
    visited: &mut HashSet<ResourceAddress>,
    rec_stack: &mut HashSet<ResourceAddress>,
    path: &mut Vec<ResourceAddress>,
) -> Option<Vec<String>> {
    visited.insert(node.clone());
    rec_stack.insert(node.clone());
    path.push(node.clone());

    if let Some(neighbors) = graph.get(node) {
        for neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let cycle_start = path.iter().position(|x| x == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[cycle_start..].iter().map(|a| a.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::tests::minimal_config;
    use crate::resources::{ResourceBody, ResourceKind, LockTable};

    /// A lock table is the simplest body; dependencies come from `depends_on` only.
    fn create_test_resource(name: &str, depends_on: Vec<&str>) -> Resource {
        let mut resource = Resource::new(
            name,
            ResourceBody::LockTable(LockTable {
                name: name.to_string(),
                hash_key: "LockID".to_string(),
                billing_mode: "PAY_PER_REQUEST".to_string(),
            }),
        );
        for dependency in depends_on {
            resource = resource.with_depends_on(ResourceAddress::new(ResourceKind::LockTable, dependency));
        }
        resource
    }

    #[test]
    fn test_valid_empty_graph() {
        assert!(validate_dependency_graph(&[]).is_ok());
    }

    #[test]
    fn test_valid_diamond_dependency() {
        let resources = vec![
            create_test_resource("a", vec![]),
            create_test_resource("b", vec!["a"]),
            create_test_resource("c", vec!["a"]),
            create_test_resource("d", vec!["b", "c"]),
        ];
        assert!(validate_dependency_graph(&resources).is_ok());
    }

    #[test]
    fn test_duplicate_addresses() {
        let resources = vec![
            create_test_resource("a", vec![]),
            create_test_resource("a", vec![]),
        ];
        let errors = validate_dependency_graph(&resources).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateAddress {
                address: "lock_table.a".to_string()
            }]
        );
    }

    #[test]
    fn test_unresolved_reference() {
        let resources = vec![create_test_resource("a", vec!["missing"])];
        let errors = validate_dependency_graph(&resources).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnresolvedReference {
                address: "lock_table.a".to_string(),
                missing: "lock_table.missing".to_string(),
            }]
        );
    }

    #[test]
    fn test_simple_cycle() {
        let resources = vec![
            create_test_resource("a", vec!["b"]),
            create_test_resource("b", vec!["a"]),
        ];
        let errors = validate_dependency_graph(&resources).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ValidationError::CyclicDependency { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&"lock_table.a".to_string()));
                assert!(cycle.contains(&"lock_table.b".to_string()));
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_cycle() {
        let resources = vec![create_test_resource("a", vec!["a"])];
        let errors = validate_dependency_graph(&resources).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::CyclicDependency {
                cycle: vec!["lock_table.a".to_string(), "lock_table.a".to_string()]
            }]
        );
    }

    #[test]
    fn test_cycle_skipped_while_references_unresolved() {
        let resources = vec![
            create_test_resource("a", vec!["b", "ghost"]),
            create_test_resource("b", vec!["a"]),
        ];
        let errors = validate_dependency_graph(&resources).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_minimal_config_is_valid() {
        assert!(validate_stack_config(&minimal_config()).is_ok());
    }

    #[test]
    fn test_zone_and_subnet_count_rules() {
        let mut config = minimal_config();
        config.network.availability_zones = vec!["eu-west-1a".to_string()];
        let errors = validate_stack_config(&config).unwrap_err();
        let fields: Vec<String> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::InvalidField { field, .. } => Some(field.clone()),
                _ => None,
            })
            .collect();
        assert!(fields.contains(&"network.availability_zones".to_string()));
        assert!(fields.contains(&"network.private_subnet_cidrs".to_string()));
    }

    #[test]
    fn test_subnet_outside_vpc_and_overlap() {
        let mut config = minimal_config();
        config.network.private_subnet_cidrs =
            vec!["10.1.1.0/24".to_string(), "10.0.0.0/23".to_string()];
        let errors = validate_stack_config(&config).unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("outside the VPC block")));
        assert!(messages.iter().any(|m| m.contains("overlaps")));
    }

    #[test]
    fn test_bucket_rules() {
        let mut config = minimal_config();
        config.storage.analysis_bucket = config.storage.raw_bucket.clone();
        config.storage.signals_bucket = "Signals_Bucket".to_string();
        let errors = validate_stack_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("already used by storage.raw_bucket"));
        assert!(errors[1].to_string().contains("storage.signals_bucket"));

        assert!(check_bucket_name("ab").is_err());
        assert!(check_bucket_name("-raw").is_err());
        assert!(check_bucket_name("raw..data").is_err());
        assert!(check_bucket_name("corrgraph.raw-data").is_ok());
    }

    #[test]
    fn test_compute_and_schedule_ranges() {
        let mut config = minimal_config();
        config.compute.memory_mb = 64;
        config.compute.timeout_seconds = 901;
        config.schedule.expression = "rate(5 minute)".to_string();
        config.graph_database.port = 0;
        let errors = validate_stack_config(&config).unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages.len(), 4, "{:?}", messages);
        assert!(messages.iter().any(|m| m.contains("compute.memory_mb")));
        assert!(messages.iter().any(|m| m.contains("compute.timeout_seconds")));
        assert!(messages.iter().any(|m| m.contains("schedule.expression")));
        assert!(messages.iter().any(|m| m.contains("graph_database.port")));
    }

    #[test]
    fn test_unknown_table_override() {
        let mut config = minimal_config();
        config
            .analytics
            .tables
            .insert("prices".to_string(), Default::default());
        let errors = validate_stack_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("analytics.tables.prices"));
    }
}
