// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use corrgraph_infra::backends::SimulatedProvider;
use corrgraph_infra::blueprint::{check_invariants, names, Stack};
use corrgraph_infra::config::{load_and_validate_config, StackConfig};
use corrgraph_infra::engine::{self, compute_levels, Applier, ApplyReport, Plan};
use corrgraph_infra::resources::{ResourceAddress, ResourceKind};
use corrgraph_infra::schedule::{InvocationBinding, InvocationMachine, TickOutcome};
use corrgraph_infra::state::{LocalBackend, StateDocument};
use corrgraph_infra::traits::{Provider, StateBackend};

/// Exit status of `plan --detailed-exitcode` when changes are pending.
const CHANGES_PENDING: u8 = 2;

#[derive(Parser)]
#[command(
    name = "corrgraph",
    version,
    about = "Provision the crypto correlation graph pipeline"
)]
struct Cli {
    /// Root directory of the emulated state bucket and lock table
    #[arg(long, global = true, env = "CORRGRAPH_STATE_DIR", default_value = ".corrgraph")]
    state_dir: PathBuf,

    /// Print plans as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the configuration, the resource graph and the stack invariants
    Validate { config: PathBuf },
    /// Show what apply would change
    Plan {
        config: PathBuf,
        /// Exit with status 2 when changes are pending
        #[arg(long)]
        detailed_exitcode: bool,
    },
    /// Plan, then apply the changes and record the result
    Apply { config: PathBuf },
    /// Delete every recorded resource
    Destroy { config: PathBuf },
    /// Print the topological levels of the declared resources
    Graph { config: PathBuf },
    /// List recorded resources and preserved state versions
    State { config: PathBuf },
    /// Run one timer tick of the ETL schedule
    Schedule { config: PathBuf },
    /// Remove a stale state lock
    ForceUnlock { config: PathBuf, lock_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Validate { config } => {
            let (config, stack) = load(config)?;
            println!(
                "✅ {}: {} resources, invariants hold",
                config.name_prefix(),
                stack.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan {
            config,
            detailed_exitcode,
        } => {
            let (config, stack) = load(config)?;
            let backend = backend(&cli, &config);
            let guard = backend.lock("plan").context("acquiring state lock")?;
            let state = backend.read().context("reading state")?;
            let plan = engine::plan(&stack, &state).context("planning")?;
            guard.release().context("releasing state lock")?;

            print_plan(&plan, cli.json)?;
            if *detailed_exitcode && plan.has_changes() {
                return Ok(ExitCode::from(CHANGES_PENDING));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Apply { config } => {
            let (config, stack) = load(config)?;
            let backend = backend(&cli, &config);
            let guard = backend.lock("apply").context("acquiring state lock")?;
            let mut state = backend.read().context("reading state")?;
            let plan = engine::plan(&stack, &state).context("planning")?;
            print_plan(&plan, cli.json)?;
            if !plan.has_changes() {
                guard.release().context("releasing state lock")?;
                return Ok(ExitCode::SUCCESS);
            }

            let applier = applier(&config, &state);
            let report = applier.apply(&stack, &plan, &mut state).await;
            // Whatever was applied is recorded, even when the run failed.
            backend.write(&mut state).context("writing state")?;
            guard.release().context("releasing state lock")?;
            finish(report.context("applying plan")?)
        }
        Command::Destroy { config } => {
            // Teardown works from recorded state, so a stack that no longer
            // passes its invariants can still be destroyed.
            let config = load_config(config)?;
            let backend = backend(&cli, &config);
            let guard = backend.lock("destroy").context("acquiring state lock")?;
            let mut state = backend.read().context("reading state")?;
            print_plan(&engine::plan_destroy(&state)?, cli.json)?;

            let applier = applier(&config, &state);
            let report = applier.destroy(&mut state).await;
            backend.write(&mut state).context("writing state")?;
            guard.release().context("releasing state lock")?;
            finish(report.context("destroying stack")?)
        }
        Command::Graph { config } => {
            let (_, stack) = load(config)?;
            let graph = stack.dependency_graph()?;
            for (index, level) in compute_levels(&graph)?.iter().enumerate() {
                let members: Vec<String> = level.iter().map(ToString::to_string).collect();
                println!("level {}: {}", index, members.join(", "));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::State { config } => {
            let config = load_config(config)?;
            let backend = backend(&cli, &config);
            let state = backend.read().context("reading state")?;
            println!("📋 {} (serial {})", backend.location(), state.serial);
            for (address, recorded) in &state.resources {
                let id = recorded.outputs.get("id").map_or("-", String::as_str);
                println!("  {} {}", address, id);
            }
            let versions = backend.versions().context("listing state versions")?;
            println!("🗂️  {} preserved versions: {:?}", versions.len(), versions);
            if let Some(holder) = backend.state_lock().holder()? {
                println!(
                    "🔒 locked by {} since {} (lock id {})",
                    holder.who, holder.created, holder.id
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Schedule { config } => {
            let (_, stack) = load(config)?;
            let rule = ResourceAddress::new(ResourceKind::ScheduleRule, names::ETL);
            let binding = InvocationBinding::from_stack(&stack, &rule)?;
            println!("⏱️  {} every {:?}", binding.expression, binding.expression.period());

            let mut machine = InvocationMachine::new(binding);
            match machine.tick()? {
                TickOutcome::Invoked { function } => println!("✅ invoked {}", function),
                TickOutcome::Denied { reason } => println!("⚠️  denied: {}", reason),
                TickOutcome::Disabled => println!("⏸️  schedule is disabled"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ForceUnlock { config, lock_id } => {
            let config = load_config(config)?;
            let released = backend(&cli, &config)
                .force_unlock(lock_id)
                .context("force-unlocking state")?;
            println!(
                "🔓 released lock {} held by {} for '{}'",
                released.id, released.who, released.operation
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: &Path) -> Result<StackConfig> {
    load_and_validate_config(path).with_context(|| format!("loading {}", path.display()))
}

/// Load a config and derive its stack, refusing stacks that break an invariant.
fn load(path: &Path) -> Result<(StackConfig, Stack)> {
    let config = load_config(path)?;
    let stack = Stack::from_config(&config);

    stack.validate().map_err(|errors| {
        anyhow!(
            "resource graph is invalid:\n  {}",
            join(errors.iter().map(ToString::to_string))
        )
    })?;
    check_invariants(&stack).map_err(|violations| {
        anyhow!(
            "stack breaks {} invariant(s):\n  {}",
            violations.len(),
            join(violations.iter().map(ToString::to_string))
        )
    })?;
    Ok((config, stack))
}

fn join(lines: impl Iterator<Item = String>) -> String {
    lines.collect::<Vec<_>>().join("\n  ")
}

fn backend(cli: &Cli, config: &StackConfig) -> LocalBackend {
    LocalBackend::new(&cli.state_dir, &config.backend)
}

/// The simulated provider, seeded with what the state says already exists.
fn applier(config: &StackConfig, state: &StateDocument) -> Applier {
    let provider: Arc<dyn Provider> =
        Arc::new(SimulatedProvider::from_config(config).with_state(state));
    println!(
        "🔧 Provider: {} ({} max concurrency, {:?})",
        provider.name(),
        config.executor_options.concurrency(),
        config.failure_strategy
    );
    Applier::from_config(provider, config)
}

fn print_plan(plan: &Plan, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    for change in plan.pending() {
        let mut line = format!("  {:>3} {}", change.action.symbol(), change.address);
        if !change.changed_fields.is_empty() {
            line.push_str(&format!(" [{}]", change.changed_fields.join(", ")));
        }
        if let Some(cause) = &change.forced_by {
            line.push_str(&format!(" (forced by {})", cause));
        }
        println!("{}", line);
    }

    let summary = plan.summary();
    println!(
        "\n📋 Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        summary.creates, summary.updates, summary.replaces, summary.deletes
    );
    Ok(())
}

fn finish(report: ApplyReport) -> Result<ExitCode> {
    println!(
        "\n⏱️  {} applied, {} failed, {} skipped in {:?}",
        report.applied.len(),
        report.failed.len(),
        report.skipped.len(),
        report.duration
    );
    if report.is_success() {
        return Ok(ExitCode::SUCCESS);
    }
    for (address, error) in &report.failed {
        eprintln!("  ❌ {}: {}", address, error);
    }
    bail!("{} resource change(s) failed", report.failed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SANDBOX: &str = "configs/correlation-pipeline.toml";

    fn cli(state_dir: &Path, args: &[&str]) -> Cli {
        let mut argv = vec!["corrgraph", "--state-dir"];
        argv.push(state_dir.to_str().unwrap());
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn destroy_ignores_invariants_of_the_current_config() {
        let dir = TempDir::new().unwrap();
        let state_dir = dir.path().join("state");
        run(cli(&state_dir, &["apply", SANDBOX])).await.unwrap();

        // Same backend, but the nodes table drifts from the writer schema.
        let drifted = dir.path().join("drifted.toml");
        let mut text = fs::read_to_string(SANDBOX).unwrap();
        text.push_str("\n[analytics.tables.nodes]\ncolumns = [{ name = \"id\", type = \"string\" }]\n");
        fs::write(&drifted, text).unwrap();
        let drifted = drifted.to_str().unwrap();

        assert!(run(cli(&state_dir, &["validate", drifted])).await.is_err());
        run(cli(&state_dir, &["destroy", drifted])).await.unwrap();

        let config = load_config(Path::new(drifted)).unwrap();
        let state = LocalBackend::new(&state_dir, &config.backend).read().unwrap();
        assert!(state.is_empty());
        assert_eq!(state.serial, 2);
    }
}
