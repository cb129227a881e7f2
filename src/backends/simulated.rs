// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! An in-process provider that behaves like the managed services closely
//! enough to exercise plans end to end.
//!
//! Identifiers are derived from a hash of account, region and address, so the
//! same declaration always yields the same ids and ARNs. The inventory can be
//! seeded from recorded state, which lets a later run update and delete what
//! an earlier run created. Like the managed services, it refuses to delete a
//! resource something else still depends on.

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::consts::{DEFAULT_ACCOUNT_ID, MIN_DATABASE_ZONES};
use crate::config::StackConfig;
use crate::errors::ProviderError;
use crate::resources::{ResourceAddress, ResourceKind};
use crate::state::StateDocument;
use crate::traits::{Outputs, Provider};

/// One provider operation, in the order it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create(ResourceAddress),
    Update(ResourceAddress),
    Delete(ResourceAddress),
}

#[derive(Debug, Default)]
struct Inventory {
    resources: BTreeMap<ResourceAddress, Outputs>,
    /// Bucket names are global across accounts; maps name to owner.
    buckets: BTreeMap<String, ResourceAddress>,
    /// Last resolved document received per resource.
    documents: BTreeMap<ResourceAddress, Value>,
    dependencies: BTreeMap<ResourceAddress, Vec<ResourceAddress>>,
    calls: Vec<ProviderCall>,
}

pub struct SimulatedProvider {
    region: String,
    account_id: String,
    inventory: Mutex<Inventory>,
    foreign_buckets: BTreeSet<String>,
    fail_on: BTreeSet<ResourceAddress>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl SimulatedProvider {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            inventory: Mutex::new(Inventory::default()),
            foreign_buckets: BTreeSet::new(),
            fail_on: BTreeSet::new(),
            latency: None,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &StackConfig) -> Self {
        Self::new(
            config.region.clone(),
            config
                .account_id
                .clone()
                .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string()),
        )
    }

    /// Seed the inventory with everything recorded in `state`.
    pub fn with_state(self, state: &StateDocument) -> Self {
        let mut inventory = Inventory::default();
        for (address, recorded) in &state.resources {
            if address.kind == ResourceKind::Bucket {
                if let Some(name) = recorded.outputs.get("bucket") {
                    inventory.buckets.insert(name.clone(), address.clone());
                }
            }
            inventory
                .resources
                .insert(address.clone(), recorded.outputs.clone());
            inventory
                .dependencies
                .insert(address.clone(), recorded.dependencies.clone());
        }
        Self {
            inventory: Mutex::new(inventory),
            ..self
        }
    }

    /// Every operation on `address` is rejected.
    pub fn fail_on(mut self, address: ResourceAddress) -> Self {
        self.fail_on.insert(address);
        self
    }

    /// Treat `name` as a bucket already owned by some other account.
    pub fn with_foreign_bucket(mut self, name: impl Into<String>) -> Self {
        self.foreign_buckets.insert(name.into());
        self
    }

    /// Delay each operation, to make concurrency observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.inventory.lock().await.calls.clone()
    }

    pub async fn outputs(&self, address: &ResourceAddress) -> Option<Outputs> {
        self.inventory.lock().await.resources.get(address).cloned()
    }

    /// The resolved document most recently created or updated at `address`.
    pub async fn document(&self, address: &ResourceAddress) -> Option<Value> {
        self.inventory.lock().await.documents.get(address).cloned()
    }

    pub async fn resource_count(&self) -> usize {
        self.inventory.lock().await.resources.len()
    }

    /// Most operations observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn digest(&self, address: &ResourceAddress) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.account_id.as_bytes());
        hasher.update(b":");
        hasher.update(self.region.as_bytes());
        hasher.update(b":");
        hasher.update(address.to_string().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn check_injected(&self, address: &ResourceAddress) -> Result<(), ProviderError> {
        if self.fail_on.contains(address) {
            return Err(ProviderError::Rejected {
                address: address.to_string(),
                service: "simulation".to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// The attributes the managed service would report for `document`.
    fn describe(&self, address: &ResourceAddress, document: &Value) -> Result<Outputs, ProviderError> {
        let hex = self.digest(address);
        let short = &hex[..17];
        let (region, account) = (self.region.as_str(), self.account_id.as_str());
        let field = |key: &str| string_field(address, document, key);

        let mut out = Outputs::new();
        let mut put = |key: &str, value: String| {
            out.insert(key.to_string(), value);
        };

        match address.kind {
            ResourceKind::Vpc
            | ResourceKind::Subnet
            | ResourceKind::InternetGateway
            | ResourceKind::ElasticIp
            | ResourceKind::NatGateway
            | ResourceKind::RouteTable
            | ResourceKind::RouteTableAssociation
            | ResourceKind::SecurityGroup
            | ResourceKind::BastionHost => {
                let (prefix, arn_type) = match address.kind {
                    ResourceKind::Vpc => ("vpc", "vpc"),
                    ResourceKind::Subnet => ("subnet", "subnet"),
                    ResourceKind::InternetGateway => ("igw", "internet-gateway"),
                    ResourceKind::ElasticIp => ("eipalloc", "elastic-ip"),
                    ResourceKind::NatGateway => ("nat", "natgateway"),
                    ResourceKind::RouteTable => ("rtb", "route-table"),
                    ResourceKind::RouteTableAssociation => ("rtbassoc", "route-table-association"),
                    ResourceKind::SecurityGroup => ("sg", "security-group"),
                    _ => ("i", "instance"),
                };
                let id = format!("{}-{}", prefix, short);
                put("arn", format!("arn:aws:ec2:{}:{}:{}/{}", region, account, arn_type, id));
                match address.kind {
                    ResourceKind::Subnet => {
                        put("availability_zone", field("availability_zone")?.to_string());
                        put("cidr_block", field("cidr_block")?.to_string());
                    }
                    ResourceKind::SecurityGroup => put("name", field("name")?.to_string()),
                    ResourceKind::ElasticIp => put("public_ip", documentation_ip(&hex, 100)),
                    ResourceKind::BastionHost => put("public_ip", documentation_ip(&hex, 113)),
                    _ => {}
                }
                put("id", id);
            }
            ResourceKind::IamRole => {
                let name = field("name")?;
                put("id", format!("AROA{}", hex[..17].to_uppercase()));
                put("arn", format!("arn:aws:iam::{}:role/{}", account, name));
                put("name", name.to_string());
            }
            ResourceKind::Bucket => {
                let bucket = field("bucket")?;
                put("id", bucket.to_string());
                put("arn", format!("arn:aws:s3:::{}", bucket));
                put("bucket", bucket.to_string());
                put("bucket_domain_name", format!("{}.s3.amazonaws.com", bucket));
            }
            ResourceKind::BucketNotification => put("id", field("bucket")?.to_string()),
            ResourceKind::LockTable => {
                let name = field("name")?;
                put("id", name.to_string());
                put("arn", format!("arn:aws:dynamodb:{}:{}:table/{}", region, account, name));
                put("name", name.to_string());
            }
            ResourceKind::GraphSubnetGroup => {
                let name = field("name")?;
                put("id", name.to_string());
                put("arn", format!("arn:aws:rds:{}:{}:subgrp:{}", region, account, name));
                put("name", name.to_string());
            }
            ResourceKind::GraphCluster => {
                let identifier = field("cluster_identifier")?;
                let port = document
                    .get("port")
                    .and_then(Value::as_u64)
                    .unwrap_or_default();
                put("id", identifier.to_string());
                put("arn", format!("arn:aws:rds:{}:{}:cluster:{}", region, account, identifier));
                put("cluster_identifier", identifier.to_string());
                put("cluster_resource_id", format!("cluster-{}", hex[..26].to_uppercase()));
                put(
                    "endpoint",
                    format!("{}.cluster-{}.{}.neptune.amazonaws.com", identifier, &hex[..12], region),
                );
                put(
                    "reader_endpoint",
                    format!("{}.cluster-ro-{}.{}.neptune.amazonaws.com", identifier, &hex[..12], region),
                );
                put("port", port.to_string());
            }
            ResourceKind::GraphInstance => {
                let identifier = field("identifier")?;
                put("id", identifier.to_string());
                put("arn", format!("arn:aws:rds:{}:{}:db:{}", region, account, identifier));
                put(
                    "endpoint",
                    format!("{}.{}.{}.neptune.amazonaws.com", identifier, &hex[..12], region),
                );
            }
            ResourceKind::ContainerRepository => {
                let name = field("name")?;
                put("id", name.to_string());
                put("arn", format!("arn:aws:ecr:{}:{}:repository/{}", region, account, name));
                put("name", name.to_string());
                put(
                    "repository_url",
                    format!("{}.dkr.ecr.{}.amazonaws.com/{}", account, region, name),
                );
            }
            ResourceKind::Function => {
                let name = field("function_name")?;
                let arn = format!("arn:aws:lambda:{}:{}:function:{}", region, account, name);
                put("id", name.to_string());
                put(
                    "invoke_arn",
                    format!(
                        "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
                        region, arn
                    ),
                );
                put("arn", arn);
                put("function_name", name.to_string());
            }
            ResourceKind::ScheduleRule => {
                let name = field("name")?;
                put("id", name.to_string());
                put("arn", format!("arn:aws:events:{}:{}:rule/{}", region, account, name));
                put("name", name.to_string());
            }
            ResourceKind::ScheduleTarget => {
                put("id", format!("{}-{}", field("rule")?, field("target_id")?));
            }
            ResourceKind::InvokePermission => put("id", field("statement_id")?.to_string()),
            ResourceKind::CatalogDatabase => {
                let name = field("name")?;
                put("id", format!("{}:{}", account, name));
                put("arn", format!("arn:aws:glue:{}:{}:database/{}", region, account, name));
                put("name", name.to_string());
            }
            ResourceKind::CatalogTable => {
                let (database, name) = (field("database_name")?, field("name")?);
                put("id", format!("{}:{}:{}", account, database, name));
                put(
                    "arn",
                    format!("arn:aws:glue:{}:{}:table/{}/{}", region, account, database, name),
                );
                put("name", name.to_string());
            }
            ResourceKind::QueryWorkgroup => {
                let name = field("name")?;
                put("id", name.to_string());
                put("arn", format!("arn:aws:athena:{}:{}:workgroup/{}", region, account, name));
                put("name", name.to_string());
            }
            ResourceKind::NotebookLifecycleConfig => {
                let name = field("name")?;
                put("id", name.to_string());
                put(
                    "arn",
                    format!(
                        "arn:aws:sagemaker:{}:{}:notebook-instance-lifecycle-config/{}",
                        region, account, name
                    ),
                );
                put("name", name.to_string());
            }
            ResourceKind::NotebookInstance => {
                let name = field("name")?;
                put("id", name.to_string());
                put(
                    "arn",
                    format!("arn:aws:sagemaker:{}:{}:notebook-instance/{}", region, account, name),
                );
                put("name", name.to_string());
                put("url", format!("{}.notebook.{}.sagemaker.aws", name, region));
            }
        }

        Ok(out)
    }

    /// The first live resource that depends on `address`.
    fn dependent_of<'a>(
        inventory: &'a Inventory,
        address: &ResourceAddress,
    ) -> Option<&'a ResourceAddress> {
        inventory
            .dependencies
            .iter()
            .find(|(dependent, dependencies)| {
                *dependent != address
                    && inventory.resources.contains_key(*dependent)
                    && dependencies.contains(address)
            })
            .map(|(dependent, _)| dependent)
    }

    /// Service rules checked before anything is recorded.
    fn enforce_rules(
        &self,
        inventory: &Inventory,
        address: &ResourceAddress,
        document: &Value,
    ) -> Result<(), ProviderError> {
        match address.kind {
            ResourceKind::Bucket => {
                let name = string_field(address, document, "bucket")?;
                let taken_here = inventory
                    .buckets
                    .get(name)
                    .is_some_and(|owner| owner != address);
                if taken_here || self.foreign_buckets.contains(name) {
                    return Err(ProviderError::Conflict {
                        address: address.to_string(),
                        reason: format!("bucket name '{}' is already taken", name),
                    });
                }
            }
            ResourceKind::GraphSubnetGroup => {
                let subnet_ids: Vec<&str> = document
                    .get("subnet_ids")
                    .and_then(Value::as_array)
                    .map(|ids| ids.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                let zones: BTreeSet<&str> = inventory
                    .resources
                    .iter()
                    .filter(|(a, outputs)| {
                        a.kind == ResourceKind::Subnet
                            && outputs
                                .get("id")
                                .is_some_and(|id| subnet_ids.contains(&id.as_str()))
                    })
                    .filter_map(|(_, outputs)| outputs.get("availability_zone"))
                    .map(String::as_str)
                    .collect();
                if zones.len() < MIN_DATABASE_ZONES {
                    return Err(ProviderError::Rejected {
                        address: address.to_string(),
                        service: "graph database".to_string(),
                        reason: format!(
                            "subnet group must cover at least {} availability zones, got {}",
                            MIN_DATABASE_ZONES,
                            zones.len()
                        ),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn string_field<'a>(
    address: &ResourceAddress,
    document: &'a Value,
    key: &str,
) -> Result<&'a str, ProviderError> {
    document
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::MalformedDocument {
            address: address.to_string(),
            reason: format!("missing string field '{}'", key),
        })
}

/// An address from the documentation ranges, stable per resource.
fn documentation_ip(hex: &str, third_octet: u8) -> String {
    let last = u8::from_str_radix(&hex[..2], 16).unwrap_or(1).max(1);
    format!("203.0.{}.{}", third_octet, last)
}

#[async_trait]
impl Provider for SimulatedProvider {
    async fn create(
        &self,
        address: &ResourceAddress,
        document: &Value,
        dependencies: &[ResourceAddress],
    ) -> Result<Outputs, ProviderError> {
        self.simulate_latency().await;
        let mut inventory = self.inventory.lock().await;
        inventory.calls.push(ProviderCall::Create(address.clone()));
        self.check_injected(address)?;

        if inventory.resources.contains_key(address) {
            return Err(ProviderError::Conflict {
                address: address.to_string(),
                reason: "already exists".to_string(),
            });
        }
        self.enforce_rules(&inventory, address, document)?;

        let outputs = self.describe(address, document)?;
        if address.kind == ResourceKind::Bucket {
            if let Some(name) = outputs.get("bucket") {
                inventory.buckets.insert(name.clone(), address.clone());
            }
        }
        inventory.resources.insert(address.clone(), outputs.clone());
        inventory.documents.insert(address.clone(), document.clone());
        inventory
            .dependencies
            .insert(address.clone(), dependencies.to_vec());
        Ok(outputs)
    }

    async fn update(
        &self,
        address: &ResourceAddress,
        document: &Value,
        dependencies: &[ResourceAddress],
        current: &Outputs,
    ) -> Result<Outputs, ProviderError> {
        self.simulate_latency().await;
        let mut inventory = self.inventory.lock().await;
        inventory.calls.push(ProviderCall::Update(address.clone()));
        self.check_injected(address)?;

        if !inventory.resources.contains_key(address) {
            return Err(ProviderError::NotFound {
                address: address.to_string(),
            });
        }
        self.enforce_rules(&inventory, address, document)?;

        let mut outputs = current.clone();
        outputs.extend(self.describe(address, document)?);
        inventory.resources.insert(address.clone(), outputs.clone());
        inventory.documents.insert(address.clone(), document.clone());
        inventory
            .dependencies
            .insert(address.clone(), dependencies.to_vec());
        Ok(outputs)
    }

    async fn delete(
        &self,
        address: &ResourceAddress,
        kind: ResourceKind,
        _current: &Outputs,
    ) -> Result<(), ProviderError> {
        self.simulate_latency().await;
        let mut inventory = self.inventory.lock().await;
        inventory.calls.push(ProviderCall::Delete(address.clone()));
        self.check_injected(address)?;

        if !inventory.resources.contains_key(address) {
            return Err(ProviderError::NotFound {
                address: address.to_string(),
            });
        }
        if let Some(dependent) = Self::dependent_of(&inventory, address) {
            return Err(ProviderError::Conflict {
                address: address.to_string(),
                reason: format!("{} still depends on it", dependent),
            });
        }

        let removed = inventory.resources.remove(address).unwrap_or_default();
        inventory.documents.remove(address);
        inventory.dependencies.remove(address);
        if kind == ResourceKind::Bucket {
            if let Some(name) = removed.get("bucket") {
                inventory.buckets.remove(name);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
