// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural invariants a declared stack must hold before it is planned.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("graph subnet group {group} spans {} availability zone(s) [{}], at least 2 are required", .zones.len(), .zones.join(", "))]
    SingleZoneSubnetGroup { group: String, zones: Vec<String> },

    #[error("security group {security_group} admits CIDR {cidr} on database port {port}")]
    OpenDatabaseIngress {
        security_group: String,
        port: u16,
        cidr: String,
    },

    #[error("security group {security_group} admits {peer} on database port {port}, which is not an allow-listed peer")]
    UnlistedDatabasePeer {
        security_group: String,
        port: u16,
        peer: String,
    },

    #[error("security group {security_group} must allow all outbound traffic")]
    ClosedEgress { security_group: String },

    #[error("private subnet {subnet} routes to internet gateway through {route_table}")]
    PrivateSubnetInternetRoute { subnet: String, route_table: String },

    #[error("subnet {subnet} has {count} route table associations, expected exactly 1")]
    SubnetRouteAssociation { subnet: String, count: usize },

    #[error("function {function} is placed in {subnet}, which is not a private subnet")]
    JobOutsidePrivateSubnet { function: String, subnet: String },

    #[error("invoke permission {permission} references {reference}, which is not a declared {expected}")]
    DanglingPermission {
        permission: String,
        reference: String,
        expected: String,
    },

    #[error("{source_address} invokes {function} but no invoke permission grants it")]
    MissingInvokePermission {
        source_address: String,
        function: String,
    },

    #[error("scheduled function {function} has no environment value referencing {expected}")]
    MissingJobEnvironment { function: String, expected: String },

    #[error("principal {principal} is assumed by {} roles [{}], expected one", .roles.len(), .roles.join(", "))]
    DuplicatePrincipalRole { principal: String, roles: Vec<String> },

    #[error("no role is declared for principal {principal}")]
    MissingPrincipalRole { principal: String },

    #[error("catalog table {table} declares columns [{}] but writers produce [{}]", .declared.join(", "), .expected.join(", "))]
    CatalogSchemaDrift {
        table: String,
        expected: Vec<String>,
        declared: Vec<String>,
    },

    #[error("catalog table {table} reads {location}, writers use prefix {expected_prefix}")]
    CatalogLocationMismatch {
        table: String,
        expected_prefix: String,
        location: String,
    },

    #[error("catalog table {table} has no writer schema")]
    UnknownCatalogTable { table: String },

    #[error("bucket {bucket} has {count} notification configurations, at most 1 is allowed")]
    DuplicateBucketNotification { bucket: String, count: usize },

    #[error("schedule rule {rule} has invalid expression '{expression}': {reason}")]
    InvalidSchedule {
        rule: String,
        expression: String,
        reason: String,
    },
}
