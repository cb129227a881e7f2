// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod cidr;
mod dependency_graph;
mod entry_points;
mod loader;
mod validation;

pub mod consts;

pub use cidr::Ipv4Cidr;
pub use dependency_graph::DependencyGraph;
pub use entry_points::EntryPoints;
pub use loader::{
    load_and_validate_config, load_config, AnalyticsConfig, BackendConfig, BastionConfig,
    ColumnOverride, ComputeConfig, ExecutorOptions, GraphDatabaseConfig, NetworkConfig,
    NotebookConfig, PackagingConfig, ScheduleConfig, StackConfig, StageConfig, StorageConfig,
    TableOverride,
};
pub use validation::{validate_dependency_graph, validate_stack_config};

#[cfg(test)]
pub(crate) use loader::tests::{minimal_config, MINIMAL_YAML};
