// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural checks over a declared [`Stack`].
//!
//! These run after the dependency graph is known to be sound and before any
//! plan is computed. Every check reports all of its violations rather than
//! stopping at the first, so one `validate` run shows everything to fix.

use std::collections::{BTreeMap, BTreeSet};

use super::Stack;
use crate::catalog::TableSchema;
use crate::errors::InvariantViolation;
use crate::observability::messages::validation::InvariantViolated;
use crate::observability::messages::StructuredLog;
use crate::resources::interpolation::references_in;
use crate::resources::{
    InvokePermission, Peer, Reference, ResourceAddress, ResourceBody, ResourceKind, RouteTarget,
    ServicePrincipal, Subnet, SubnetTier,
};
use crate::schedule::RateExpression;

pub fn check_invariants(stack: &Stack) -> Result<(), Vec<InvariantViolation>> {
    let mut violations = Vec::new();

    check_subnet_group_zones(stack, &mut violations);
    check_database_ingress(stack, &mut violations);
    check_open_egress(stack, &mut violations);
    check_private_routes(stack, &mut violations);
    check_route_associations(stack, &mut violations);
    check_function_placement(stack, &mut violations);
    check_invoke_permissions(stack, &mut violations);
    check_job_environment(stack, &mut violations);
    check_principal_roles(stack, &mut violations);
    check_catalog_tables(stack, &mut violations);
    check_bucket_notifications(stack, &mut violations);
    check_schedules(stack, &mut violations);

    for violation in &violations {
        InvariantViolated { violation }.log();
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn subnets(stack: &Stack) -> BTreeMap<&ResourceAddress, &Subnet> {
    stack
        .iter()
        .filter_map(|r| match &r.body {
            ResourceBody::Subnet(subnet) => Some((&r.address, subnet)),
            _ => None,
        })
        .collect()
}

fn permissions(stack: &Stack) -> Vec<&InvokePermission> {
    stack
        .iter()
        .filter_map(|r| match &r.body {
            ResourceBody::InvokePermission(p) => Some(p),
            _ => None,
        })
        .collect()
}

/// Security groups attached to functions, the bastion, or the notebook.
fn attached_groups(stack: &Stack) -> BTreeSet<ResourceAddress> {
    let mut groups = BTreeSet::new();
    for resource in stack.iter() {
        let attached: &[Reference] = match &resource.body {
            ResourceBody::Function(f) => &f.vpc_config.security_group_ids,
            ResourceBody::BastionHost(b) => &b.vpc_security_group_ids,
            ResourceBody::NotebookInstance(n) => &n.security_groups,
            _ => continue,
        };
        groups.extend(attached.iter().map(|r| r.address.clone()));
    }
    groups
}

fn check_subnet_group_zones(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    let subnets = subnets(stack);
    for resource in stack.of_kind(ResourceKind::GraphSubnetGroup) {
        let ResourceBody::GraphSubnetGroup(group) = &resource.body else {
            continue;
        };
        let zones: BTreeSet<&str> = group
            .subnet_ids
            .iter()
            .filter_map(|r| subnets.get(&r.address))
            .map(|s| s.availability_zone.as_str())
            .collect();
        if zones.len() < 2 {
            violations.push(InvariantViolation::SingleZoneSubnetGroup {
                group: resource.address.to_string(),
                zones: zones.into_iter().map(str::to_string).collect(),
            });
        }
    }
}

fn check_database_ingress(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    let allowed = attached_groups(stack);

    for resource in stack.of_kind(ResourceKind::GraphCluster) {
        let ResourceBody::GraphCluster(cluster) = &resource.body else {
            continue;
        };
        for group_ref in &cluster.vpc_security_group_ids {
            let Some(ResourceBody::SecurityGroup(group)) =
                stack.get(&group_ref.address).map(|r| &r.body)
            else {
                continue;
            };
            for rule in group.ingress.iter().filter(|r| r.covers_tcp_port(cluster.port)) {
                match &rule.peer {
                    Peer::Cidr(cidr) => violations.push(InvariantViolation::OpenDatabaseIngress {
                        security_group: group_ref.address.to_string(),
                        port: cluster.port,
                        cidr: cidr.clone(),
                    }),
                    Peer::SecurityGroup(peer) if !allowed.contains(&peer.address) => {
                        violations.push(InvariantViolation::UnlistedDatabasePeer {
                            security_group: group_ref.address.to_string(),
                            port: cluster.port,
                            peer: peer.address.to_string(),
                        })
                    }
                    Peer::SecurityGroup(_) => {}
                }
            }
        }
    }
}

fn check_open_egress(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    let mut groups = BTreeSet::new();
    for resource in stack.iter() {
        match &resource.body {
            ResourceBody::Function(f) => {
                groups.extend(f.vpc_config.security_group_ids.iter().map(|r| &r.address))
            }
            ResourceBody::NotebookInstance(n) => {
                groups.extend(n.security_groups.iter().map(|r| &r.address))
            }
            _ => {}
        }
    }

    for group_address in groups {
        if let Some(ResourceBody::SecurityGroup(group)) = stack.get(group_address).map(|r| &r.body) {
            if !group.egress.iter().any(|rule| rule.is_open()) {
                violations.push(InvariantViolation::ClosedEgress {
                    security_group: group_address.to_string(),
                });
            }
        }
    }
}

fn check_private_routes(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    let subnets = subnets(stack);
    for resource in stack.of_kind(ResourceKind::RouteTableAssociation) {
        let ResourceBody::RouteTableAssociation(association) = &resource.body else {
            continue;
        };
        let private = subnets
            .get(&association.subnet_id.address)
            .is_some_and(|s| s.tier == SubnetTier::Private);
        if !private {
            continue;
        }
        let Some(ResourceBody::RouteTable(table)) =
            stack.get(&association.route_table_id.address).map(|r| &r.body)
        else {
            continue;
        };
        let routes_to_gateway = table.routes.iter().any(|route| {
            matches!(&route.target, RouteTarget::GatewayId(r) if r.address.kind == ResourceKind::InternetGateway)
        });
        if routes_to_gateway {
            violations.push(InvariantViolation::PrivateSubnetInternetRoute {
                subnet: association.subnet_id.address.to_string(),
                route_table: association.route_table_id.address.to_string(),
            });
        }
    }
}

fn check_route_associations(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    let mut counts: BTreeMap<&ResourceAddress, usize> =
        subnets(stack).into_keys().map(|address| (address, 0)).collect();
    for resource in stack.of_kind(ResourceKind::RouteTableAssociation) {
        if let ResourceBody::RouteTableAssociation(association) = &resource.body {
            if let Some(count) = counts.get_mut(&association.subnet_id.address) {
                *count += 1;
            }
        }
    }
    for (subnet, count) in counts {
        if count != 1 {
            violations.push(InvariantViolation::SubnetRouteAssociation {
                subnet: subnet.to_string(),
                count,
            });
        }
    }
}

fn check_function_placement(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    let subnets = subnets(stack);
    for resource in stack.of_kind(ResourceKind::Function) {
        let ResourceBody::Function(function) = &resource.body else {
            continue;
        };
        for subnet_ref in &function.vpc_config.subnet_ids {
            let private = subnets
                .get(&subnet_ref.address)
                .is_some_and(|s| s.tier == SubnetTier::Private);
            if !private {
                violations.push(InvariantViolation::JobOutsidePrivateSubnet {
                    function: resource.address.to_string(),
                    subnet: subnet_ref.address.to_string(),
                });
            }
        }
    }
}

fn check_invoke_permissions(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    for resource in stack.of_kind(ResourceKind::InvokePermission) {
        let ResourceBody::InvokePermission(permission) = &resource.body else {
            continue;
        };
        let function = &permission.function_name.address;
        if function.kind != ResourceKind::Function || stack.get(function).is_none() {
            violations.push(InvariantViolation::DanglingPermission {
                permission: resource.address.to_string(),
                reference: function.to_string(),
                expected: "function".to_string(),
            });
        }
        let source = &permission.source_arn.address;
        let source_kind_ok = matches!(source.kind, ResourceKind::ScheduleRule | ResourceKind::Bucket);
        if !source_kind_ok || stack.get(source).is_none() {
            violations.push(InvariantViolation::DanglingPermission {
                permission: resource.address.to_string(),
                reference: source.to_string(),
                expected: "schedule rule or bucket".to_string(),
            });
        }
    }

    let permissions = permissions(stack);
    let mut invocations: Vec<(&ResourceAddress, &ResourceAddress)> = Vec::new();
    for resource in stack.iter() {
        match &resource.body {
            ResourceBody::ScheduleTarget(target) => {
                invocations.push((&target.rule.address, &target.arn.address))
            }
            ResourceBody::BucketNotification(notification) => invocations.push((
                &notification.bucket.address,
                &notification.lambda_function_arn.address,
            )),
            _ => {}
        }
    }
    for (source, function) in invocations {
        if !permissions.iter().any(|p| p.grants(function, source)) {
            violations.push(InvariantViolation::MissingInvokePermission {
                source_address: source.to_string(),
                function: function.to_string(),
            });
        }
    }
}

fn check_job_environment(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    for resource in stack.of_kind(ResourceKind::ScheduleTarget) {
        let ResourceBody::ScheduleTarget(target) = &resource.body else {
            continue;
        };
        let Some(ResourceBody::Function(function)) = stack.get(&target.arn.address).map(|r| &r.body)
        else {
            continue;
        };
        let references: Vec<Reference> = function
            .environment
            .values()
            .flat_map(|value| references_in(value))
            .collect();

        let names_bucket = references.iter().any(|r| {
            r.address.kind == ResourceKind::Bucket && stack.get(&r.address).is_some()
        });
        if !names_bucket {
            violations.push(InvariantViolation::MissingJobEnvironment {
                function: target.arn.address.to_string(),
                expected: "a declared bucket".to_string(),
            });
        }

        let names_endpoint = references.iter().any(|r| {
            r.address.kind == ResourceKind::GraphCluster
                && r.attribute == "endpoint"
                && stack.get(&r.address).is_some()
        });
        if !names_endpoint {
            violations.push(InvariantViolation::MissingJobEnvironment {
                function: target.arn.address.to_string(),
                expected: "the graph cluster endpoint".to_string(),
            });
        }
    }
}

fn check_principal_roles(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    let mut roles: BTreeMap<ServicePrincipal, Vec<String>> = BTreeMap::new();
    for resource in stack.of_kind(ResourceKind::IamRole) {
        if let ResourceBody::IamRole(role) = &resource.body {
            roles
                .entry(role.trust)
                .or_default()
                .push(resource.address.to_string());
        }
    }

    let has_notebook = stack.of_kind(ResourceKind::NotebookInstance).next().is_some();
    for principal in ServicePrincipal::ALL {
        let assumed_by = roles.remove(&principal).unwrap_or_default();
        let required = principal != ServicePrincipal::Notebook || has_notebook;
        match assumed_by.len() {
            0 if required => violations.push(InvariantViolation::MissingPrincipalRole {
                principal: principal.to_string(),
            }),
            0 | 1 => {}
            _ => violations.push(InvariantViolation::DuplicatePrincipalRole {
                principal: principal.to_string(),
                roles: assumed_by,
            }),
        }
    }
}

fn column_labels<'a>(columns: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<String> {
    columns.map(|(name, kind)| format!("{} {}", name, kind)).collect()
}

fn check_catalog_tables(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    for resource in stack.of_kind(ResourceKind::CatalogTable) {
        let ResourceBody::CatalogTable(table) = &resource.body else {
            continue;
        };
        let Some(schema) = TableSchema::by_name(&table.name) else {
            violations.push(InvariantViolation::UnknownCatalogTable {
                table: table.name.clone(),
            });
            continue;
        };

        let expected_columns = schema.catalog_columns();
        let expected = column_labels(
            expected_columns
                .iter()
                .map(|c| (c.name.as_str(), c.column_type.as_str())),
        );
        let declared = column_labels(
            table
                .columns
                .iter()
                .map(|c| (c.name.as_str(), c.column_type.as_str())),
        );
        if expected != declared {
            violations.push(InvariantViolation::CatalogSchemaDrift {
                table: table.name.clone(),
                expected,
                declared,
            });
        }

        let key = table
            .location
            .strip_prefix("s3://")
            .and_then(|rest| rest.split_once('/'))
            .map(|(_, key)| key);
        if key != Some(schema.prefix) {
            violations.push(InvariantViolation::CatalogLocationMismatch {
                table: table.name.clone(),
                expected_prefix: schema.prefix.to_string(),
                location: table.location.clone(),
            });
        }
    }
}

fn check_bucket_notifications(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    let mut counts: BTreeMap<&ResourceAddress, usize> = BTreeMap::new();
    for resource in stack.of_kind(ResourceKind::BucketNotification) {
        if let ResourceBody::BucketNotification(notification) = &resource.body {
            *counts.entry(&notification.bucket.address).or_default() += 1;
        }
    }
    for (bucket, count) in counts {
        if count > 1 {
            violations.push(InvariantViolation::DuplicateBucketNotification {
                bucket: bucket.to_string(),
                count,
            });
        }
    }
}

fn check_schedules(stack: &Stack, violations: &mut Vec<InvariantViolation>) {
    for resource in stack.of_kind(ResourceKind::ScheduleRule) {
        if let ResourceBody::ScheduleRule(rule) = &resource.body {
            if let Err(e) = rule.schedule_expression.parse::<RateExpression>() {
                violations.push(InvariantViolation::InvalidSchedule {
                    rule: resource.address.to_string(),
                    expression: rule.schedule_expression.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
}
