// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use super::Reference;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSubnetGroup {
    pub name: String,
    pub subnet_ids: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphCluster {
    pub cluster_identifier: String,
    pub engine: String,
    pub engine_version: String,
    pub port: u16,
    pub subnet_group_name: Reference,
    pub vpc_security_group_ids: Vec<Reference>,
    /// Roles the cluster assumes for bulk loads from storage.
    pub iam_roles: Vec<Reference>,
    pub skip_final_snapshot: bool,
    pub apply_immediately: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInstance {
    pub identifier: String,
    pub cluster_identifier: Reference,
    pub instance_class: String,
    pub engine: String,
}
