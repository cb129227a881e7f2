// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Reference;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDatabase {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

/// An external table: a column schema laid over delimited files at `location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTable {
    pub name: String,
    pub database_name: Reference,
    pub table_type: String,
    pub location: String,
    pub columns: Vec<Column>,
    pub input_format: String,
    pub output_format: String,
    pub serde_library: String,
    #[serde(default)]
    pub serde_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryWorkgroup {
    pub name: String,
    pub output_location: String,
    pub enforce_workgroup_configuration: bool,
    pub publish_cloudwatch_metrics_enabled: bool,
}
