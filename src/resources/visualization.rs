// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reference;

/// Start-up script that points the notebook's graph magics at the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookLifecycleConfig {
    pub name: String,
    pub on_start: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookInstance {
    pub name: String,
    pub instance_type: String,
    pub role_arn: Reference,
    pub subnet_id: Reference,
    pub security_groups: Vec<Reference>,
    pub lifecycle_config_name: Reference,
    pub direct_internet_access: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BastionHost {
    pub ami: String,
    pub instance_type: String,
    pub subnet_id: Reference,
    pub vpc_security_group_ids: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    pub associate_public_ip_address: bool,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}
