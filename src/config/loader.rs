// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_GRAPH_PORT, DEFAULT_MEMORY_MB, DEFAULT_REGION, DEFAULT_SCHEDULE,
    DEFAULT_TIMEOUT_SECONDS, PLACEHOLDER_IMAGE_TAG,
};
use crate::errors::{ConfigError, FailureStrategy};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Complete description of one deployment of the correlation pipeline.
///
/// Everything the blueprint needs to derive the resource graph comes from
/// here. Only `project`, `backend`, `network`, `storage` and `bastion` are
/// required; every other section falls back to the defaults in
/// [`crate::config::consts`].
///
/// # Example
/// ```yaml
/// project: corrgraph
/// environment: dev
/// backend:
///   bucket: corrgraph-tfstate
///   key: infra/terraform.tfstate
///   lock_table: corrgraph-locks
/// network:
///   cidr_block: 10.0.0.0/16
///   availability_zones: [eu-west-1a, eu-west-1b]
///   public_subnet_cidr: 10.0.0.0/24
///   private_subnet_cidrs: [10.0.1.0/24, 10.0.2.0/24]
/// storage:
///   raw_bucket: corrgraph-raw-data
///   analysis_bucket: corrgraph-analysis
///   signals_bucket: corrgraph-signals
/// bastion:
///   ami: ami-0123456789abcdef0
///   management_cidr: 203.0.113.0/24
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StackConfig {
    pub project: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub account_id: Option<String>,
    pub backend: BackendConfig,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub graph_database: GraphDatabaseConfig,
    #[serde(default)]
    pub compute: ComputeConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default = "StageConfig::loader")]
    pub loader: StageConfig,
    #[serde(default = "StageConfig::signals")]
    pub signals: StageConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub notebook: NotebookConfig,
    pub bastion: BastionConfig,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
}

impl StackConfig {
    /// Prefix applied to every named resource, e.g. `corrgraph-dev`.
    pub fn name_prefix(&self) -> String {
        format!("{}-{}", self.project, self.environment)
    }

    pub fn tags(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Project".to_string(), self.project.clone()),
            ("Environment".to_string(), self.environment.clone()),
            ("ManagedBy".to_string(), "corrgraph".to_string()),
        ])
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

/// The single canonical remote state location and its lock table.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub bucket: String,
    pub key: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub lock_table: String,
}

impl BackendConfig {
    /// Key of the lock record guarding this state, `<bucket>/<key>`.
    pub fn lock_id(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub cidr_block: String,
    pub availability_zones: Vec<String>,
    pub public_subnet_cidr: String,
    pub private_subnet_cidrs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub raw_bucket: String,
    pub analysis_bucket: String,
    pub signals_bucket: String,
    #[serde(default)]
    pub force_destroy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphDatabaseConfig {
    #[serde(default = "GraphDatabaseConfig::default_engine_version")]
    pub engine_version: String,
    #[serde(default = "GraphDatabaseConfig::default_instance_class")]
    pub instance_class: String,
    #[serde(default = "GraphDatabaseConfig::default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub skip_final_snapshot: bool,
}

impl GraphDatabaseConfig {
    fn default_engine_version() -> String {
        "1.3.2.0".to_string()
    }

    fn default_instance_class() -> String {
        "db.t4g.medium".to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_GRAPH_PORT
    }
}

impl Default for GraphDatabaseConfig {
    fn default() -> Self {
        Self {
            engine_version: Self::default_engine_version(),
            instance_class: Self::default_instance_class(),
            port: DEFAULT_GRAPH_PORT,
            skip_final_snapshot: true,
        }
    }
}

/// The scheduled ETL function.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputeConfig {
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default = "ComputeConfig::default_memory")]
    pub memory_mb: u32,
    #[serde(default = "ComputeConfig::default_timeout")]
    pub timeout_seconds: u32,
    #[serde(default)]
    pub packaging: PackagingConfig,
}

impl ComputeConfig {
    fn default_memory() -> u32 {
        DEFAULT_MEMORY_MB
    }

    fn default_timeout() -> u32 {
        DEFAULT_TIMEOUT_SECONDS
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            function_name: None,
            memory_mb: DEFAULT_MEMORY_MB,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            packaging: PackagingConfig::default(),
        }
    }
}

/// How the ETL code is shipped. Exactly one variant applies.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PackagingConfig {
    Archive {
        #[serde(default = "PackagingConfig::default_runtime")]
        runtime: String,
        #[serde(default = "PackagingConfig::default_handler")]
        handler: String,
        #[serde(default = "PackagingConfig::default_archive_path")]
        archive_path: String,
        /// Pinned layer ARNs; empty means the region's managed numerical layer.
        #[serde(default)]
        layers: Vec<String>,
    },
    Container {
        #[serde(default)]
        repository: Option<String>,
        #[serde(default = "PackagingConfig::default_image_tag")]
        image_tag: String,
    },
}

impl PackagingConfig {
    fn default_runtime() -> String {
        "python3.11".to_string()
    }

    fn default_handler() -> String {
        "lambda_function.lambda_handler".to_string()
    }

    fn default_archive_path() -> String {
        "build/etl.zip".to_string()
    }

    fn default_image_tag() -> String {
        PLACEHOLDER_IMAGE_TAG.to_string()
    }

    /// Managed pandas/numpy layer published for `region`.
    pub fn managed_layer(region: &str) -> String {
        format!(
            "arn:aws:lambda:{}:336392948345:layer:AWSSDKPandas-Python311:12",
            region
        )
    }
}

impl Default for PackagingConfig {
    fn default() -> Self {
        PackagingConfig::Archive {
            runtime: Self::default_runtime(),
            handler: Self::default_handler(),
            archive_path: Self::default_archive_path(),
            layers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "ScheduleConfig::default_expression")]
    pub expression: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ScheduleConfig {
    fn default_expression() -> String {
        DEFAULT_SCHEDULE.to_string()
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            expression: Self::default_expression(),
            enabled: true,
        }
    }
}

/// One of the event-driven pipeline stages (graph loader, signals).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub function_name: Option<String>,
    pub handler: String,
}

impl StageConfig {
    pub fn loader() -> Self {
        Self {
            enabled: true,
            function_name: None,
            handler: "loader.lambda_handler".to_string(),
        }
    }

    pub fn signals() -> Self {
        Self {
            enabled: true,
            function_name: None,
            handler: "signals.handler".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "AnalyticsConfig::default_database")]
    pub database_name: String,
    #[serde(default = "AnalyticsConfig::default_workgroup")]
    pub workgroup: String,
    /// Per-table overrides keyed by table name (`nodes`, `edges`).
    #[serde(default)]
    pub tables: BTreeMap<String, TableOverride>,
}

impl AnalyticsConfig {
    fn default_database() -> String {
        "crypto_correlation".to_string()
    }

    fn default_workgroup() -> String {
        "crypto-correlation".to_string()
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            database_name: Self::default_database(),
            workgroup: Self::default_workgroup(),
            tables: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableOverride {
    /// Replacement column list as `name: type` pairs, in order.
    #[serde(default)]
    pub columns: Option<Vec<ColumnOverride>>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnOverride {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotebookConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "NotebookConfig::default_instance_type")]
    pub instance_type: String,
}

impl NotebookConfig {
    fn default_instance_type() -> String {
        "ml.t3.medium".to_string()
    }
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instance_type: Self::default_instance_type(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BastionConfig {
    pub ami: String,
    #[serde(default = "BastionConfig::default_instance_type")]
    pub instance_type: String,
    #[serde(default)]
    pub key_name: Option<String>,
    /// Operator address range admitted on the management port.
    pub management_cidr: String,
}

impl BastionConfig {
    fn default_instance_type() -> String {
        "t3.micro".to_string()
    }
}

/// Engine tuning for apply runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
}

impl ExecutorOptions {
    /// Configured bound, or the host's available parallelism.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
    }
}

/// Load a stack configuration, choosing the format by file extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<StackConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    match extension {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        "toml" => Ok(toml::from_str(&content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a stack configuration and check its field-level rules.
///
/// Graph-level checks (duplicates, unresolved references, cycles) run later
/// over the derived stack; see [`crate::config::validate_dependency_graph`].
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<StackConfig, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_stack_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}
