// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The serverless functions and the bindings that invoke them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Reference, ResourceAddress, ResourceKind};

/// Registry repository the container packaging pulls from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRepository {
    pub name: String,
    pub image_tag_mutability: String,
    pub scan_on_push: bool,
}

/// How function code is delivered. The two variants never coexist on one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "package_type", rename_all = "snake_case")]
pub enum Packaging {
    /// Zipped interpreted code plus pinned managed layers.
    Archive {
        runtime: String,
        handler: String,
        filename: String,
        layers: Vec<String>,
    },
    /// A container image; `command` overrides the image entry point handler.
    Image {
        image_uri: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        command: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcConfig {
    pub subnet_ids: Vec<Reference>,
    pub security_group_ids: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub function_name: String,
    pub role: Reference,
    pub packaging: Packaging,
    pub memory_size: u32,
    pub timeout: u32,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub vpc_config: VpcConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRule {
    pub name: String,
    pub description: String,
    pub schedule_expression: String,
    pub enabled: bool,
}

/// Binds a schedule rule to the function it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTarget {
    pub rule: Reference,
    pub target_id: String,
    pub arn: Reference,
}

/// Grants a service principal the right to invoke a function from a given source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokePermission {
    pub statement_id: String,
    pub action: String,
    pub function_name: Reference,
    pub principal: String,
    pub source_arn: Reference,
}

impl InvokePermission {
    /// Whether this permission lets `source` invoke `function`.
    pub fn grants(&self, function: &ResourceAddress, source: &ResourceAddress) -> bool {
        self.function_name.address == *function
            && self.source_arn.address == *source
            && self.source_arn.attribute == "arn"
            && self.principal == principal_for(source.kind)
    }
}

/// The service principal that delivers invocations from a source of `kind`.
pub fn principal_for(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Bucket => "s3.amazonaws.com",
        _ => "events.amazonaws.com",
    }
}
