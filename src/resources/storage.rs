// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketPurpose {
    /// Raw extracts and the node/edge CSVs the catalog maps.
    Raw,
    /// Analysis output and query results.
    Analysis,
    /// Trading signals appended by the signals stage.
    Signals,
}

/// Long-lived object storage. No lifecycle rule is declared, so growth is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub bucket: String,
    pub purpose: BucketPurpose,
    pub force_destroy: bool,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Object-created events from a bucket delivered to a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketNotification {
    pub bucket: Reference,
    pub lambda_function_arn: Reference,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_suffix: Option<String>,
}

/// Key-value table holding the provisioning lock record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockTable {
    pub name: String,
    pub hash_key: String,
    pub billing_mode: String,
}
