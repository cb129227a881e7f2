// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end runs of the shipped configurations against the simulated
//! provider and a filesystem state backend.

use std::sync::Arc;
use tempfile::TempDir;

use crate::backends::SimulatedProvider;
use crate::blueprint::{check_invariants, names, Stack};
use crate::config::{load_and_validate_config, StackConfig};
use crate::engine::{plan, Action, Applier};
use crate::errors::FailureStrategy;
use crate::resources::{ResourceAddress, ResourceKind};
use crate::state::LocalBackend;
use crate::traits::{Provider, StateBackend};

fn load(path: &str) -> (StackConfig, Stack) {
    let config = load_and_validate_config(path).expect("config loads");
    let stack = Stack::from_config(&config);
    stack.validate().expect("stack validates");
    check_invariants(&stack).expect("invariants hold");
    (config, stack)
}

fn applier_for(config: &StackConfig, provider: &Arc<SimulatedProvider>) -> Applier {
    Applier::from_config(Arc::clone(provider) as Arc<dyn Provider>, config)
}

#[tokio::test]
async fn test_apply_then_replan_is_empty() {
    let (config, stack) = load("configs/correlation-pipeline.yaml");
    let dir = TempDir::new().unwrap();
    let backend = LocalBackend::new(dir.path(), &config.backend);
    let provider = Arc::new(SimulatedProvider::from_config(&config));
    let applier = applier_for(&config, &provider);

    let guard = backend.lock("apply").unwrap();
    let mut state = backend.read().unwrap();
    let first = plan(&stack, &state).unwrap();
    assert_eq!(first.summary().creates, stack.len());

    let report = applier.apply(&stack, &first, &mut state).await.unwrap();
    assert!(report.is_success(), "{:?}", report.failed);
    backend.write(&mut state).unwrap();
    guard.release().unwrap();

    let reloaded = backend.read().unwrap();
    assert_eq!(reloaded.serial, 1);
    assert_eq!(reloaded.len(), stack.len());

    let second = plan(&stack, &reloaded).unwrap();
    assert!(!second.has_changes());
    assert_eq!(second.summary().unchanged, stack.len());
}

#[tokio::test]
async fn test_etl_environment_resolves_to_concrete_values() {
    let (config, stack) = load("configs/correlation-pipeline.yaml");
    let provider = Arc::new(SimulatedProvider::from_config(&config));
    let mut state = crate::state::StateDocument::new(config.backend.lock_id());

    let plan = plan(&stack, &state).unwrap();
    applier_for(&config, &provider)
        .apply(&stack, &plan, &mut state)
        .await
        .unwrap();

    let etl = ResourceAddress::new(ResourceKind::Function, names::ETL);
    let document = provider.document(&etl).await.unwrap();
    let environment = &document["environment"];
    assert_eq!(environment["S3_BUCKET_NAME"], "corrgraph-dev-raw-data");

    let cluster = ResourceAddress::new(ResourceKind::GraphCluster, names::MAIN);
    let endpoint = provider.outputs(&cluster).await.unwrap()["endpoint"].clone();
    assert_eq!(environment["NEPTUNE_ENDPOINT"], endpoint.as_str());

    // State keeps the symbolic form so later plans compare declarations.
    let recorded = state.get(&etl).unwrap();
    assert_eq!(
        recorded.document["environment"]["NEPTUNE_ENDPOINT"],
        "${graph_cluster.main.endpoint}"
    );
}

#[tokio::test]
async fn test_failed_apply_persists_partial_state_and_recovers() {
    let (mut config, stack) = load("configs/correlation-pipeline.yaml");
    config.failure_strategy = FailureStrategy::ContinueOnError;
    let dir = TempDir::new().unwrap();
    let backend = LocalBackend::new(dir.path(), &config.backend);
    let cluster = ResourceAddress::new(ResourceKind::GraphCluster, names::MAIN);

    let failing = Arc::new(SimulatedProvider::from_config(&config).fail_on(cluster.clone()));
    let mut state = backend.read().unwrap();
    let first = plan(&stack, &state).unwrap();
    let report = applier_for(&config, &failing)
        .apply(&stack, &first, &mut state)
        .await
        .unwrap();
    backend.write(&mut state).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 1);
    assert!(!report.skipped.is_empty());
    assert!(state.get(&cluster).is_none());

    // A healthy provider seeded with what already exists finishes the job.
    let mut state = backend.read().unwrap();
    let healthy = Arc::new(SimulatedProvider::from_config(&config).with_state(&state));
    let second = plan(&stack, &state).unwrap();
    assert_eq!(second.action(&cluster), Action::Create);
    assert_eq!(
        second.summary().creates,
        report.failed.len() + report.skipped.len()
    );

    let report = applier_for(&config, &healthy)
        .apply(&stack, &second, &mut state)
        .await
        .unwrap();
    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(state.len(), stack.len());
}

#[tokio::test]
async fn test_container_packaging_apply_and_destroy() {
    let (config, stack) = load("configs/correlation-pipeline-container.yaml");
    let provider = Arc::new(SimulatedProvider::from_config(&config));
    let applier = applier_for(&config, &provider);
    let mut state = crate::state::StateDocument::new(config.backend.lock_id());

    let plan = plan(&stack, &state).unwrap();
    let repository = ResourceAddress::new(ResourceKind::ContainerRepository, names::ETL);
    let etl = ResourceAddress::new(ResourceKind::Function, names::ETL);
    let level_of = |a: &ResourceAddress| plan.levels.iter().position(|l| l.contains(a)).unwrap();
    assert!(level_of(&repository) < level_of(&etl));

    let report = applier.apply(&stack, &plan, &mut state).await.unwrap();
    assert!(report.is_success(), "{:?}", report.failed);
    assert!(provider.peak_in_flight() <= config.executor_options.concurrency());

    let report = applier.destroy(&mut state).await.unwrap();
    assert!(report.is_success(), "{:?}", report.failed);
    assert!(state.is_empty());
    assert_eq!(provider.resource_count().await, 0);
}

#[tokio::test]
async fn test_three_zone_toml_stack_applies() {
    let (config, stack) = load("configs/correlation-pipeline.toml");
    let provider = Arc::new(SimulatedProvider::from_config(&config));
    let mut state = crate::state::StateDocument::new(config.backend.lock_id());

    let plan = plan(&stack, &state).unwrap();
    let report = applier_for(&config, &provider)
        .apply(&stack, &plan, &mut state)
        .await
        .unwrap();

    assert!(report.is_success(), "{:?}", report.failed);
    let third = ResourceAddress::new(ResourceKind::Subnet, names::private_subnet(2));
    assert_eq!(
        state.outputs(&third).unwrap()["availability_zone"],
        "eu-west-1c"
    );
}
