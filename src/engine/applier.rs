// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::planner::{plan_destroy, Action, Plan};
use crate::blueprint::Stack;
use crate::config::StackConfig;
use crate::errors::{ExecutionError, FailureStrategy};
use crate::observability::messages::engine::{
    ApplyCompleted, ApplyStarted, ChangeCompleted, ChangeFailed, ChangeSkipped, ChangeStarted,
};
use crate::observability::messages::StructuredLog;
use crate::resources::interpolation::resolve_document;
use crate::resources::{Reference, ResourceAddress, ResourceKind};
use crate::state::{ResourceState, StateDocument};
use crate::traits::{Outputs, Provider};

/// What happened to each planned change.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<(ResourceAddress, Action)>,
    pub failed: Vec<(ResourceAddress, ExecutionError)>,
    pub skipped: Vec<ResourceAddress>,
    pub duration: Duration,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// One change handed to a task.
struct Job {
    address: ResourceAddress,
    kind: ResourceKind,
    action: Action,
    level: usize,
    /// Symbolic document; resolved inside the task.
    document: Value,
    dependencies: Vec<ResourceAddress>,
    current: Outputs,
    /// Remove the existing instance, whatever the planned action.
    teardown: bool,
}

/// What gets recorded in state once a job succeeds.
struct Record {
    address: ResourceAddress,
    kind: ResourceKind,
    action: Action,
    document: Value,
    dependencies: Vec<ResourceAddress>,
}

struct Running {
    record: Record,
    handle: JoinHandle<Result<Option<Outputs>, ExecutionError>>,
}

/// Applies a [`Plan`] level by level through a [`Provider`].
///
/// Replaced resources are torn down first, dependents before dependencies.
/// The declared levels then run forward, creating the replacements, and
/// deletions of undeclared resources come last. Changes within a level run
/// concurrently, bounded by a semaphore. Recorded state is updated after
/// every level, so a failed run still leaves a state document describing
/// exactly what exists.
pub struct Applier {
    provider: Arc<dyn Provider>,
    max_concurrency: usize,
    failure_strategy: FailureStrategy,
}

impl Applier {
    pub fn new(
        provider: Arc<dyn Provider>,
        max_concurrency: usize,
        failure_strategy: FailureStrategy,
    ) -> Self {
        Self {
            provider,
            max_concurrency: max_concurrency.max(1),
            failure_strategy,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &StackConfig) -> Self {
        Self::new(
            provider,
            config.executor_options.concurrency(),
            config.failure_strategy,
        )
    }

    /// Delete everything recorded in `state`.
    pub async fn destroy(&self, state: &mut StateDocument) -> Result<ApplyReport, ExecutionError> {
        let plan = plan_destroy(state)?;
        self.apply(&Stack::default(), &plan, state).await
    }

    pub async fn apply(
        &self,
        stack: &Stack,
        plan: &Plan,
        state: &mut StateDocument,
    ) -> Result<ApplyReport, ExecutionError> {
        let started = Instant::now();
        let mut report = ApplyReport::default();
        // Failed or skipped; dependents of these are skipped under ContinueOnError.
        let mut blocked: BTreeSet<ResourceAddress> = BTreeSet::new();
        let mut stopped = false;

        ApplyStarted {
            change_count: plan.summary().pending(),
            level_count: plan.teardown_levels.len()
                + plan.levels.len()
                + plan.deletion_levels.len(),
            max_concurrency: self.max_concurrency,
        }
        .log();

        for (index, level) in plan.teardown_levels.iter().enumerate() {
            let jobs = self.removals(
                level,
                index,
                plan,
                state,
                stopped,
                &mut blocked,
                &mut report,
            );
            self.run_level(jobs, state, &mut report, &mut blocked).await;
            if self.failure_strategy == FailureStrategy::FailFast && !report.failed.is_empty() {
                stopped = true;
            }
        }

        let forward_base = plan.teardown_levels.len();
        for (index, level) in plan.levels.iter().enumerate() {
            let mut jobs = Vec::new();
            for address in level {
                let action = plan.action(address);
                if action == Action::NoOp {
                    continue;
                }
                let resource = stack.get(address).ok_or_else(|| ExecutionError::InternalError {
                    message: format!("planned change for undeclared resource '{}'", address),
                })?;
                let dependencies = resource.dependencies()?;
                // A replacement also waits on its old instance being gone.
                let mut waits_on = dependencies.clone();
                if action == Action::Replace {
                    waits_on.push(address.clone());
                }

                if self.skip(address, &waits_on, stopped, &blocked, &mut report) {
                    blocked.insert(address.clone());
                    continue;
                }
                jobs.push(Job {
                    address: address.clone(),
                    kind: resource.kind(),
                    action,
                    level: forward_base + index,
                    document: resource.document()?,
                    dependencies,
                    current: state.outputs(address).cloned().unwrap_or_default(),
                    teardown: false,
                });
            }

            self.run_level(jobs, state, &mut report, &mut blocked).await;
            if self.failure_strategy == FailureStrategy::FailFast && !report.failed.is_empty() {
                stopped = true;
            }
        }

        let deletion_base = forward_base + plan.levels.len();
        for (index, level) in plan.deletion_levels.iter().enumerate() {
            let jobs = self.removals(
                level,
                deletion_base + index,
                plan,
                state,
                stopped,
                &mut blocked,
                &mut report,
            );
            self.run_level(jobs, state, &mut report, &mut blocked).await;
            if self.failure_strategy == FailureStrategy::FailFast && !report.failed.is_empty() {
                stopped = true;
            }
        }

        report.duration = started.elapsed();
        ApplyCompleted {
            applied: report.applied.len(),
            failed: report.failed.len(),
            skipped: report.skipped.len(),
            duration: report.duration,
        }
        .log();
        Ok(report)
    }

    /// Jobs removing the recorded instances in `level`.
    #[allow(clippy::too_many_arguments)]
    fn removals(
        &self,
        level: &[ResourceAddress],
        index: usize,
        plan: &Plan,
        state: &StateDocument,
        stopped: bool,
        blocked: &mut BTreeSet<ResourceAddress>,
        report: &mut ApplyReport,
    ) -> Vec<Job> {
        let mut jobs = Vec::new();
        for address in level {
            let Some(recorded) = state.get(address) else {
                continue;
            };
            // A removal waits on whatever still depends on it.
            let dependents: Vec<ResourceAddress> = state
                .resources
                .iter()
                .filter(|(_, r)| r.dependencies.contains(address))
                .map(|(a, _)| a.clone())
                .collect();
            if self.skip(address, &dependents, stopped, blocked, report) {
                blocked.insert(address.clone());
                continue;
            }
            jobs.push(Job {
                address: address.clone(),
                kind: recorded.kind,
                action: plan.action(address),
                level: index,
                document: recorded.document.clone(),
                dependencies: recorded.dependencies.clone(),
                current: recorded.outputs.clone(),
                teardown: true,
            });
        }
        jobs
    }

    /// Decide whether a change must be skipped, recording it if so.
    fn skip(
        &self,
        address: &ResourceAddress,
        waits_on: &[ResourceAddress],
        stopped: bool,
        blocked: &BTreeSet<ResourceAddress>,
        report: &mut ApplyReport,
    ) -> bool {
        let cause = if stopped {
            report.failed.first().map(|(a, _)| a.clone())
        } else if self.failure_strategy == FailureStrategy::ContinueOnError {
            waits_on.iter().find(|d| blocked.contains(*d)).cloned()
        } else {
            None
        };

        match cause {
            Some(cause) => {
                ChangeSkipped {
                    address: &address.to_string(),
                    failed_dependency: &cause.to_string(),
                }
                .log();
                report.skipped.push(address.clone());
                true
            }
            None => false,
        }
    }

    /// Run one level's jobs concurrently and fold the outcomes into `state`.
    async fn run_level(
        &self,
        jobs: Vec<Job>,
        state: &mut StateDocument,
        report: &mut ApplyReport,
        blocked: &mut BTreeSet<ResourceAddress>,
    ) {
        if jobs.is_empty() {
            return;
        }

        let outputs: Arc<BTreeMap<ResourceAddress, Outputs>> = Arc::new(
            state
                .resources
                .iter()
                .map(|(address, recorded)| (address.clone(), recorded.outputs.clone()))
                .collect(),
        );
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let mut tasks: Vec<Running> = Vec::with_capacity(jobs.len());
        for job in jobs {
            let provider = Arc::clone(&self.provider);
            let outputs = Arc::clone(&outputs);
            let semaphore = Arc::clone(&semaphore);
            let record = Record {
                address: job.address.clone(),
                kind: job.kind,
                action: job.action,
                document: job.document.clone(),
                dependencies: job.dependencies.clone(),
            };

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return Err(ExecutionError::InternalError {
                            message: format!("semaphore closed before {} ran: {}", job.address, e),
                        })
                    }
                };
                execute(provider.as_ref(), job, &outputs).await
            });
            tasks.push(Running { record, handle });
        }

        for Running { record, handle } in tasks {
            let Record {
                address,
                kind,
                action,
                document,
                dependencies,
            } = record;
            let outcome = handle.await.unwrap_or_else(|e| {
                Err(ExecutionError::TaskFailed {
                    address: address.to_string(),
                    message: e.to_string(),
                })
            });

            match outcome {
                Ok(Some(outputs)) => {
                    state.insert(
                        address.clone(),
                        ResourceState {
                            kind,
                            document,
                            dependencies,
                            outputs,
                        },
                    );
                    report.applied.push((address, action));
                }
                Ok(None) => {
                    state.remove(&address);
                    // A replacement is reported once its new instance exists.
                    if action != Action::Replace {
                        report.applied.push((address, action));
                    }
                }
                Err(error) => {
                    blocked.insert(address.clone());
                    report.failed.push((address, error));
                }
            }
        }
    }
}

/// Resolve the job's document against earlier outputs and call the provider.
async fn execute(
    provider: &dyn Provider,
    job: Job,
    outputs: &BTreeMap<ResourceAddress, Outputs>,
) -> Result<Option<Outputs>, ExecutionError> {
    let address = job.address.to_string();
    ChangeStarted {
        address: &address,
        action: job.action.as_str(),
        level: job.level,
    }
    .log();
    let started = Instant::now();

    let result = run(provider, &job, outputs).await;

    match &result {
        Ok(_) => ChangeCompleted {
            address: &address,
            action: job.action.as_str(),
            duration: started.elapsed(),
        }
        .log(),
        Err(error) => ChangeFailed {
            address: &address,
            action: job.action.as_str(),
            error,
        }
        .log(),
    }

    result
}

async fn run(
    provider: &dyn Provider,
    job: &Job,
    outputs: &BTreeMap<ResourceAddress, Outputs>,
) -> Result<Option<Outputs>, ExecutionError> {
    let failed = |source| ExecutionError::ResourceFailed {
        address: job.address.to_string(),
        action: job.action.to_string(),
        source,
    };

    if job.teardown {
        provider
            .delete(&job.address, job.kind, &job.current)
            .await
            .map_err(failed)?;
        return Ok(None);
    }

    let lookup = |reference: &Reference| {
        outputs
            .get(&reference.address)
            .and_then(|o| o.get(&reference.attribute))
            .cloned()
    };
    let resolved = resolve_document(&job.document, &lookup).map_err(|reference| {
        let reason = if outputs.contains_key(&reference.address) {
            format!("{} does not export '{}'", reference.address, reference.attribute)
        } else {
            format!("{} has not been applied", reference.address)
        };
        ExecutionError::UnresolvedReference {
            address: job.address.to_string(),
            reference: reference.to_string(),
            reason,
        }
    })?;

    // A replacement's old instance was removed during teardown.
    let applied = match job.action {
        Action::Update => provider
            .update(&job.address, &resolved, &job.dependencies, &job.current)
            .await
            .map_err(failed)?,
        _ => provider
            .create(&job.address, &resolved, &job.dependencies)
            .await
            .map_err(failed)?,
    };
    Ok(Some(applied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{ProviderCall, SimulatedProvider};
    use crate::blueprint::names;
    use crate::config::minimal_config;
    use crate::engine::planner::plan;
    use crate::resources::ResourceBody;

    fn addr(kind: ResourceKind, name: &str) -> ResourceAddress {
        ResourceAddress::new(kind, name)
    }

    fn applier(provider: &Arc<SimulatedProvider>, strategy: FailureStrategy) -> Applier {
        Applier::new(Arc::clone(provider) as Arc<dyn Provider>, 4, strategy)
    }

    fn provider() -> Arc<SimulatedProvider> {
        Arc::new(SimulatedProvider::from_config(&minimal_config()))
    }

    #[tokio::test]
    async fn apply_records_every_resource() {
        let stack = Stack::from_config(&minimal_config());
        let provider = provider();
        let mut state = StateDocument::new("b/k");

        let plan = plan(&stack, &state).unwrap();
        let report = applier(&provider, FailureStrategy::FailFast)
            .apply(&stack, &plan, &mut state)
            .await
            .unwrap();

        assert!(report.is_success(), "{:?}", report.failed);
        assert_eq!(report.applied.len(), stack.len());
        assert_eq!(state.len(), stack.len());
        assert_eq!(provider.resource_count().await, stack.len());
    }

    #[tokio::test]
    async fn fail_fast_finishes_level_then_stops() {
        let stack = Stack::from_config(&minimal_config());
        let vpc = addr(ResourceKind::Vpc, names::MAIN);
        let raw = addr(ResourceKind::Bucket, names::RAW);
        let provider = Arc::new(SimulatedProvider::from_config(&minimal_config()).fail_on(vpc.clone()));
        let mut state = StateDocument::new("b/k");

        let plan = plan(&stack, &state).unwrap();
        let report = applier(&provider, FailureStrategy::FailFast)
            .apply(&stack, &plan, &mut state)
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, vpc);
        // Same level as the vpc, so it still ran and was recorded.
        assert!(state.get(&raw).is_some());
        assert_eq!(state.len(), plan.levels[0].len() - 1);
        assert_eq!(report.skipped.len(), stack.len() - plan.levels[0].len());
    }

    #[tokio::test]
    async fn continue_on_error_skips_only_dependents() {
        let stack = Stack::from_config(&minimal_config());
        let bucket = addr(ResourceKind::Bucket, names::SIGNALS);
        let provider = Arc::new(SimulatedProvider::from_config(&minimal_config()).fail_on(bucket.clone()));
        let mut state = StateDocument::new("b/k");

        let plan = plan(&stack, &state).unwrap();
        let report = applier(&provider, FailureStrategy::ContinueOnError)
            .apply(&stack, &plan, &mut state)
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        // The signals stage and the compute role reference the bucket.
        assert!(report.skipped.contains(&addr(ResourceKind::IamRole, names::COMPUTE)));
        assert!(report.skipped.contains(&addr(ResourceKind::Function, names::SIGNALS)));
        assert!(state.get(&addr(ResourceKind::Vpc, names::MAIN)).is_some());
        assert_eq!(
            report.applied.len() + report.failed.len() + report.skipped.len(),
            stack.len()
        );
    }

    #[tokio::test]
    async fn best_effort_fails_dependents_at_resolution() {
        let stack = Stack::from_config(&minimal_config());
        let bucket = addr(ResourceKind::Bucket, names::SIGNALS);
        let provider = Arc::new(SimulatedProvider::from_config(&minimal_config()).fail_on(bucket.clone()));
        let mut state = StateDocument::new("b/k");

        let plan = plan(&stack, &state).unwrap();
        let report = applier(&provider, FailureStrategy::BestEffort)
            .apply(&stack, &plan, &mut state)
            .await
            .unwrap();

        assert!(report.skipped.is_empty());
        let role = report
            .failed
            .iter()
            .find(|(a, _)| *a == addr(ResourceKind::IamRole, names::COMPUTE))
            .map(|(_, e)| e)
            .unwrap();
        assert!(matches!(role, ExecutionError::UnresolvedReference { reference, .. } if reference == "${bucket.signals.arn}"));
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let stack = Stack::from_config(&minimal_config());
        let provider = Arc::new(
            SimulatedProvider::from_config(&minimal_config())
                .with_latency(Duration::from_millis(5)),
        );
        let mut state = StateDocument::new("b/k");

        let plan = plan(&stack, &state).unwrap();
        Applier::new(Arc::clone(&provider) as Arc<dyn Provider>, 2, FailureStrategy::FailFast)
            .apply(&stack, &plan, &mut state)
            .await
            .unwrap();

        assert!(provider.peak_in_flight() <= 2);
        assert!(provider.peak_in_flight() >= 1);
    }

    #[tokio::test]
    async fn replacement_tears_down_dependents_before_recreating() {
        let stack = Stack::from_config(&minimal_config());
        let provider = provider();
        let applier = applier(&provider, FailureStrategy::FailFast);
        let mut state = StateDocument::new("b/k");
        let first = plan(&stack, &state).unwrap();
        applier.apply(&stack, &first, &mut state).await.unwrap();
        let created = provider.calls().await.len();

        let mut changed = stack.clone();
        let vpc = addr(ResourceKind::Vpc, names::MAIN);
        if let Some(ResourceBody::Vpc(v)) = changed.get_mut(&vpc).map(|r| &mut r.body) {
            v.cidr_block = "10.9.0.0/16".to_string();
        }
        let second = plan(&changed, &state).unwrap();
        let report = applier.apply(&changed, &second, &mut state).await.unwrap();
        assert!(report.is_success(), "{:?}", report.failed);
        assert_eq!(report.applied.len(), second.summary().pending());

        let calls: Vec<ProviderCall> = provider.calls().await.split_off(created);
        let position = |call: &ProviderCall| calls.iter().position(|c| c == call).unwrap();
        let vpc_deleted = position(&ProviderCall::Delete(vpc.clone()));
        let vpc_created = position(&ProviderCall::Create(vpc.clone()));
        for subnet in [names::PUBLIC, "private_a", "private_b"] {
            let subnet = addr(ResourceKind::Subnet, subnet);
            assert!(position(&ProviderCall::Delete(subnet.clone())) < vpc_deleted);
            assert!(vpc_created < position(&ProviderCall::Create(subnet)));
        }
        let last_delete = calls
            .iter()
            .rposition(|c| matches!(c, ProviderCall::Delete(_)))
            .unwrap();
        assert!(last_delete < vpc_created);

        assert_eq!(state.len(), stack.len());
        assert_eq!(provider.resource_count().await, stack.len());
        assert_eq!(state.get(&vpc).unwrap().document["cidr_block"], "10.9.0.0/16");
        assert!(!plan(&changed, &state).unwrap().has_changes());
    }

    #[tokio::test]
    async fn failed_teardown_keeps_the_old_instance_recorded() {
        let stack = Stack::from_config(&minimal_config());
        let subnet = addr(ResourceKind::Subnet, names::PUBLIC);
        let mut state = StateDocument::new("b/k");
        let first = plan(&stack, &state).unwrap();
        applier(&provider(), FailureStrategy::FailFast)
            .apply(&stack, &first, &mut state)
            .await
            .unwrap();

        let mut changed = stack.clone();
        let vpc = addr(ResourceKind::Vpc, names::MAIN);
        if let Some(ResourceBody::Vpc(v)) = changed.get_mut(&vpc).map(|r| &mut r.body) {
            v.cidr_block = "10.9.0.0/16".to_string();
        }
        let failing = Arc::new(
            SimulatedProvider::from_config(&minimal_config())
                .with_state(&state)
                .fail_on(subnet.clone()),
        );
        let second = plan(&changed, &state).unwrap();
        let report = applier(&failing, FailureStrategy::ContinueOnError)
            .apply(&changed, &second, &mut state)
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert!(report.skipped.contains(&vpc));
        assert!(report.skipped.contains(&subnet));
        assert!(state.get(&vpc).is_some());
        assert!(state.get(&subnet).is_some());
        assert!(failing.outputs(&vpc).await.is_some());
    }

    #[tokio::test]
    async fn destroy_deletes_dependents_first() {
        let stack = Stack::from_config(&minimal_config());
        let provider = provider();
        let applier = applier(&provider, FailureStrategy::FailFast);
        let mut state = StateDocument::new("b/k");

        let plan = plan(&stack, &state).unwrap();
        applier.apply(&stack, &plan, &mut state).await.unwrap();

        let report = applier.destroy(&mut state).await.unwrap();
        assert!(report.is_success());
        assert!(state.is_empty());
        assert_eq!(provider.resource_count().await, 0);

        let deletes: Vec<ResourceAddress> = provider
            .calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Delete(address) => Some(address),
                _ => None,
            })
            .collect();
        let position = |a: &ResourceAddress| deletes.iter().position(|d| d == a).unwrap();
        assert!(
            position(&addr(ResourceKind::Function, names::ETL))
                < position(&addr(ResourceKind::Subnet, "private_a"))
        );
        assert!(
            position(&addr(ResourceKind::Subnet, "private_a"))
                < position(&addr(ResourceKind::Vpc, names::MAIN))
        );
    }
}
