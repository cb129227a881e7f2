// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed declarations for every resource the pipeline provisions.
//!
//! A [`Resource`] pairs a unique [`ResourceAddress`] (`kind.name`) with a typed
//! [`ResourceBody`]. Cross-resource wiring is expressed with [`Reference`]s,
//! which render as `${kind.name.attribute}` and may appear inside any string
//! field. References are the only source of implicit dependencies: the
//! dependency graph, the planner and the applier all discover them by walking
//! the serialized body.
//!
//! ```
//! use corrgraph_infra::resources::{Reference, ResourceAddress, ResourceKind};
//!
//! let raw = ResourceAddress::new(ResourceKind::Bucket, "raw");
//! let location = format!("s3://{}/upload/nodes/", Reference::to(&raw, "bucket"));
//! assert_eq!(location, "s3://${bucket.raw.bucket}/upload/nodes/");
//! ```

pub mod access;
pub mod analytics;
pub mod compute;
pub mod graph_db;
pub mod identity;
pub mod interpolation;
pub mod network;
pub mod storage;
pub mod visualization;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use access::{Peer, Protocol, SecurityGroup, SecurityRule};
pub use analytics::{CatalogDatabase, CatalogTable, Column, QueryWorkgroup};
pub use compute::{
    ContainerRepository, Function, InvokePermission, Packaging, ScheduleRule, ScheduleTarget,
    VpcConfig,
};
pub use graph_db::{GraphCluster, GraphInstance, GraphSubnetGroup};
pub use identity::{Effect, IamRole, PolicyStatement, ServicePrincipal};
pub use network::{
    ElasticIp, InternetGateway, NatGateway, Route, RouteTable, RouteTableAssociation, RouteTarget,
    Subnet, SubnetTier, Vpc,
};
pub use storage::{Bucket, BucketNotification, BucketPurpose, LockTable};
pub use visualization::{BastionHost, NotebookInstance, NotebookLifecycleConfig};

/// Every kind of resource the stack can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    Subnet,
    InternetGateway,
    ElasticIp,
    NatGateway,
    RouteTable,
    RouteTableAssociation,
    SecurityGroup,
    IamRole,
    Bucket,
    BucketNotification,
    LockTable,
    GraphSubnetGroup,
    GraphCluster,
    GraphInstance,
    ContainerRepository,
    Function,
    ScheduleRule,
    ScheduleTarget,
    InvokePermission,
    CatalogDatabase,
    CatalogTable,
    QueryWorkgroup,
    NotebookLifecycleConfig,
    NotebookInstance,
    BastionHost,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 26] = [
        ResourceKind::Vpc,
        ResourceKind::Subnet,
        ResourceKind::InternetGateway,
        ResourceKind::ElasticIp,
        ResourceKind::NatGateway,
        ResourceKind::RouteTable,
        ResourceKind::RouteTableAssociation,
        ResourceKind::SecurityGroup,
        ResourceKind::IamRole,
        ResourceKind::Bucket,
        ResourceKind::BucketNotification,
        ResourceKind::LockTable,
        ResourceKind::GraphSubnetGroup,
        ResourceKind::GraphCluster,
        ResourceKind::GraphInstance,
        ResourceKind::ContainerRepository,
        ResourceKind::Function,
        ResourceKind::ScheduleRule,
        ResourceKind::ScheduleTarget,
        ResourceKind::InvokePermission,
        ResourceKind::CatalogDatabase,
        ResourceKind::CatalogTable,
        ResourceKind::QueryWorkgroup,
        ResourceKind::NotebookLifecycleConfig,
        ResourceKind::NotebookInstance,
        ResourceKind::BastionHost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::InternetGateway => "internet_gateway",
            ResourceKind::ElasticIp => "elastic_ip",
            ResourceKind::NatGateway => "nat_gateway",
            ResourceKind::RouteTable => "route_table",
            ResourceKind::RouteTableAssociation => "route_table_association",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::IamRole => "iam_role",
            ResourceKind::Bucket => "bucket",
            ResourceKind::BucketNotification => "bucket_notification",
            ResourceKind::LockTable => "lock_table",
            ResourceKind::GraphSubnetGroup => "graph_subnet_group",
            ResourceKind::GraphCluster => "graph_cluster",
            ResourceKind::GraphInstance => "graph_instance",
            ResourceKind::ContainerRepository => "container_repository",
            ResourceKind::Function => "function",
            ResourceKind::ScheduleRule => "schedule_rule",
            ResourceKind::ScheduleTarget => "schedule_target",
            ResourceKind::InvokePermission => "invoke_permission",
            ResourceKind::CatalogDatabase => "catalog_database",
            ResourceKind::CatalogTable => "catalog_table",
            ResourceKind::QueryWorkgroup => "query_workgroup",
            ResourceKind::NotebookLifecycleConfig => "notebook_lifecycle_config",
            ResourceKind::NotebookInstance => "notebook_instance",
            ResourceKind::BastionHost => "bastion_host",
        }
    }

    /// Top-level attributes whose change cannot be applied in place.
    ///
    /// A planned change touching any of these becomes a replacement
    /// (delete followed by create) instead of an update.
    pub fn replace_on(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Vpc => &["cidr_block"],
            ResourceKind::Subnet => &["vpc_id", "cidr_block", "availability_zone"],
            ResourceKind::InternetGateway => &["vpc_id"],
            ResourceKind::ElasticIp => &["domain"],
            ResourceKind::NatGateway => &["allocation_id", "subnet_id"],
            ResourceKind::RouteTable => &["vpc_id"],
            ResourceKind::RouteTableAssociation => &["subnet_id", "route_table_id"],
            ResourceKind::SecurityGroup => &["name", "vpc_id"],
            ResourceKind::IamRole => &["name", "trust"],
            ResourceKind::Bucket => &["bucket"],
            ResourceKind::BucketNotification => &["bucket"],
            ResourceKind::LockTable => &["name", "hash_key"],
            ResourceKind::GraphSubnetGroup => &["name"],
            ResourceKind::GraphCluster => &["cluster_identifier", "engine", "subnet_group_name"],
            ResourceKind::GraphInstance => &["identifier", "cluster_identifier", "engine"],
            ResourceKind::ContainerRepository => &["name"],
            ResourceKind::Function => &["function_name"],
            ResourceKind::ScheduleRule => &["name"],
            ResourceKind::ScheduleTarget => &["rule", "target_id"],
            ResourceKind::InvokePermission => {
                &["statement_id", "function_name", "principal", "source_arn"]
            }
            ResourceKind::CatalogDatabase => &["name"],
            ResourceKind::CatalogTable => &["name", "database_name"],
            ResourceKind::QueryWorkgroup => &["name"],
            ResourceKind::NotebookLifecycleConfig => &["name"],
            ResourceKind::NotebookInstance => &["name", "subnet_id", "security_groups"],
            ResourceKind::BastionHost => &["ami", "subnet_id"],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown resource kind '{}'", s))
    }
}

/// Unique identity of a declared resource: `kind.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceAddress {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceAddress {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

impl FromStr for ResourceAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once('.')
            .ok_or_else(|| format!("address '{}' is not of the form kind.name", s))?;
        if name.is_empty() || name.contains('.') {
            return Err(format!("address '{}' has an invalid name", s));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

impl Serialize for ResourceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A pointer to an attribute another resource exports once it exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    pub address: ResourceAddress,
    pub attribute: String,
}

impl Reference {
    pub fn to(address: &ResourceAddress, attribute: impl Into<String>) -> Self {
        Self {
            address: address.clone(),
            attribute: attribute.into(),
        }
    }

    /// Parse the inside of a `${...}` placeholder, e.g. `subnet.private_a.id`.
    pub fn parse_path(path: &str) -> Result<Self, String> {
        let mut parts = path.splitn(3, '.');
        let (Some(kind), Some(name), Some(attribute)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!(
                "reference '{}' is not of the form kind.name.attribute",
                path
            ));
        };
        if attribute.is_empty() {
            return Err(format!("reference '{}' has an empty attribute", path));
        }
        Ok(Self {
            address: ResourceAddress::new(kind.parse()?, name),
            attribute: attribute.to_string(),
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.address, self.attribute)
    }
}

impl FromStr for Reference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| format!("'{}' is not a ${{...}} reference", s))?;
        Reference::parse_path(inner)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Typed definition of a resource. Serialized with a `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceBody {
    Vpc(Vpc),
    Subnet(Subnet),
    InternetGateway(InternetGateway),
    ElasticIp(ElasticIp),
    NatGateway(NatGateway),
    RouteTable(RouteTable),
    RouteTableAssociation(RouteTableAssociation),
    SecurityGroup(SecurityGroup),
    IamRole(IamRole),
    Bucket(Bucket),
    BucketNotification(BucketNotification),
    LockTable(LockTable),
    GraphSubnetGroup(GraphSubnetGroup),
    GraphCluster(GraphCluster),
    GraphInstance(GraphInstance),
    ContainerRepository(ContainerRepository),
    Function(Function),
    ScheduleRule(ScheduleRule),
    ScheduleTarget(ScheduleTarget),
    InvokePermission(InvokePermission),
    CatalogDatabase(CatalogDatabase),
    CatalogTable(CatalogTable),
    QueryWorkgroup(QueryWorkgroup),
    NotebookLifecycleConfig(NotebookLifecycleConfig),
    NotebookInstance(NotebookInstance),
    BastionHost(BastionHost),
}

impl ResourceBody {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceBody::Vpc(_) => ResourceKind::Vpc,
            ResourceBody::Subnet(_) => ResourceKind::Subnet,
            ResourceBody::InternetGateway(_) => ResourceKind::InternetGateway,
            ResourceBody::ElasticIp(_) => ResourceKind::ElasticIp,
            ResourceBody::NatGateway(_) => ResourceKind::NatGateway,
            ResourceBody::RouteTable(_) => ResourceKind::RouteTable,
            ResourceBody::RouteTableAssociation(_) => ResourceKind::RouteTableAssociation,
            ResourceBody::SecurityGroup(_) => ResourceKind::SecurityGroup,
            ResourceBody::IamRole(_) => ResourceKind::IamRole,
            ResourceBody::Bucket(_) => ResourceKind::Bucket,
            ResourceBody::BucketNotification(_) => ResourceKind::BucketNotification,
            ResourceBody::LockTable(_) => ResourceKind::LockTable,
            ResourceBody::GraphSubnetGroup(_) => ResourceKind::GraphSubnetGroup,
            ResourceBody::GraphCluster(_) => ResourceKind::GraphCluster,
            ResourceBody::GraphInstance(_) => ResourceKind::GraphInstance,
            ResourceBody::ContainerRepository(_) => ResourceKind::ContainerRepository,
            ResourceBody::Function(_) => ResourceKind::Function,
            ResourceBody::ScheduleRule(_) => ResourceKind::ScheduleRule,
            ResourceBody::ScheduleTarget(_) => ResourceKind::ScheduleTarget,
            ResourceBody::InvokePermission(_) => ResourceKind::InvokePermission,
            ResourceBody::CatalogDatabase(_) => ResourceKind::CatalogDatabase,
            ResourceBody::CatalogTable(_) => ResourceKind::CatalogTable,
            ResourceBody::QueryWorkgroup(_) => ResourceKind::QueryWorkgroup,
            ResourceBody::NotebookLifecycleConfig(_) => ResourceKind::NotebookLifecycleConfig,
            ResourceBody::NotebookInstance(_) => ResourceKind::NotebookInstance,
            ResourceBody::BastionHost(_) => ResourceKind::BastionHost,
        }
    }
}

/// A declared resource: address, typed body and explicit ordering hints.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub address: ResourceAddress,
    pub body: ResourceBody,
    /// Dependencies that no attribute reference expresses, e.g. a NAT gateway
    /// waiting for the internet gateway.
    pub depends_on: Vec<ResourceAddress>,
}

impl Resource {
    pub fn new(name: impl Into<String>, body: ResourceBody) -> Self {
        Self {
            address: ResourceAddress::new(body.kind(), name),
            body,
            depends_on: Vec::new(),
        }
    }

    pub fn with_depends_on(mut self, address: ResourceAddress) -> Self {
        self.depends_on.push(address);
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.address.kind
    }

    /// The body as a JSON document, references left symbolic.
    pub fn document(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.body)
    }

    /// All references embedded in the body, in document order, deduplicated.
    pub fn references(&self) -> Result<Vec<Reference>, serde_json::Error> {
        let document = self.document()?;
        Ok(interpolation::collect_references(&document))
    }

    /// Addresses this resource must wait for: referenced resources plus `depends_on`.
    pub fn dependencies(&self) -> Result<Vec<ResourceAddress>, serde_json::Error> {
        let mut dependencies: Vec<ResourceAddress> = self
            .references()?
            .into_iter()
            .map(|reference| reference.address)
            .chain(self.depends_on.iter().cloned())
            .collect();
        dependencies.sort();
        dependencies.dedup();
        Ok(dependencies)
    }
}
