//! Thin end-to-end wiring: Workspace Model -> Filter -> Task Graph Builder
//! -> Scheduler. Everything a real CLI needs beyond this — flag-parsing
//! depth, process execution, caching, remote cache, TUI rendering — is out
//! of the core's scope (spec §1) and is intentionally not reproduced here.

pub mod cli;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod visitor;

use std::{collections::HashSet, str::FromStr, sync::Arc};

use error::CliError;
use taskgraph_engine::GraphBuilder;
use taskgraph_exec::{SchedulerOptions, SchedulerReport};
use taskgraph_scope::{FilterResolver, PackagesChangedInRange, ScopeError, TargetSelector};
use taskgraph_task_id::PackageName;
use visitor::{LoggingUi, LoggingVisitor};

/// No SCM collaborator is wired into this demo binary (spec §1's Non-goals
/// — the core never probes the filesystem itself); `--filter`'s
/// change-based ranges always report nothing changed here.
struct NoScm;

impl PackagesChangedInRange for NoScm {
    fn changed_packages(
        &self,
        _from_ref: Option<&str>,
        _to_ref: Option<&str>,
    ) -> Result<HashSet<PackageName>, ScopeError> {
        Ok(HashSet::new())
    }
}

pub fn run(args: cli::Args) -> Result<SchedulerReport, CliError> {
    let workspace = manifest::load(&args.workspace)?;

    let selectors = args
        .filters
        .iter()
        .map(|raw| TargetSelector::from_str(raw).map_err(|e| CliError::Selector(e, raw.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let (packages, is_all) = FilterResolver::new(&workspace.graph).resolve(&selectors, &NoScm)?;
    tracing::info!(count = packages.len(), is_all, "resolved entry packages");

    let mut entries = Vec::new();
    for package in &packages {
        for task in &args.tasks {
            entries.push((package.clone(), task.clone()));
        }
    }

    let builder = GraphBuilder::new(&workspace.graph, &workspace.loader, args.tasks_only);
    let engine = builder.build(&entries)?;
    tracing::info!(nodes = engine.nodes().count(), "task graph built");

    let runtime = tokio::runtime::Runtime::new().expect("failed to start the tokio runtime");
    let report = runtime.block_on(taskgraph_exec::run(
        &engine,
        Arc::new(LoggingVisitor::new()),
        Arc::new(LoggingUi),
        SchedulerOptions {
            concurrency: args.concurrency,
            parallel: args.parallel,
            continue_on_failure: args.continue_on_failure,
        },
    ));

    tracing::info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        blocked = report.blocked.len(),
        "run finished"
    );
    for (task_id, message) in &report.failed {
        tracing::error!(task = %task_id, %message, "task failed");
    }

    if report.failed.is_empty() {
        Ok(report)
    } else {
        Err(CliError::TasksFailed {
            count: report.failed.len(),
        })
    }
}
