//! The Scheduler (C6): drives a [`Walker`] over a task graph, dispatching
//! each non-root node to a [`Visitor`] under a concurrency-bounded
//! semaphore, and applies the failure policy from spec §4.6.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use futures::stream::{FuturesUnordered, StreamExt};
use petgraph::{
    graph::{DiGraph, NodeIndex},
    Direction,
};
use taskgraph_engine::{Built, Engine, TaskNode};
use taskgraph_task_id::TaskId;
use tokio::sync::{Mutex, Semaphore};

use crate::{
    collaborators::{Ui, Visitor},
    walker::Walker,
};

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Bounds simultaneous in-flight `Visitor` calls. Ignored when
    /// `parallel` is set.
    pub concurrency: usize,
    /// Unbounded concurrency, and all non-root edges are stripped before
    /// walking: order between sibling tasks is explicitly not respected
    /// (spec §4.6).
    pub parallel: bool,
    /// See [`SchedulerReport`] for how failures are reported under each
    /// policy (spec §4.6).
    pub continue_on_failure: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            concurrency: 10,
            parallel: false,
            continue_on_failure: false,
        }
    }
}

/// The outcome of one scheduler run.
#[derive(Debug, Default, Clone)]
pub struct SchedulerReport {
    pub succeeded: Vec<TaskId<'static>>,
    pub failed: Vec<(TaskId<'static>, String)>,
    /// Tasks skipped because a dependency failed (`continue_on_failure =
    /// true` only); never attempted, and not themselves counted as
    /// failures (spec §4.6).
    pub blocked: Vec<TaskId<'static>>,
}

fn build_walk_graph(engine: &Engine<Built>, parallel: bool) -> DiGraph<TaskNode, ()> {
    let mut graph = DiGraph::new();
    let mut indices = HashMap::new();
    for node in engine.nodes() {
        indices.insert(node.clone(), graph.add_node(node.clone()));
    }
    for (from, to) in engine.edges() {
        if !parallel || to.is_root() {
            graph.add_edge(indices[from], indices[to], ());
        }
    }
    graph
}

/// Executes `engine`'s task graph against `visitor` (spec §4.6). The
/// synthetic root is always "visited" but its visit is suppressed; a
/// non-root node is dispatched to the visitor only once every one of its
/// dependencies has completed.
pub async fn run(
    engine: &Engine<Built>,
    visitor: Arc<dyn Visitor>,
    ui: Arc<dyn Ui>,
    options: SchedulerOptions,
) -> SchedulerReport {
    let graph = Arc::new(build_walk_graph(engine, options.parallel));
    let semaphore = (!options.parallel).then(|| Arc::new(Semaphore::new(options.concurrency.max(1))));
    let report = Arc::new(Mutex::new(SchedulerReport::default()));
    let failed_indices: Arc<Mutex<HashSet<NodeIndex>>> = Arc::new(Mutex::new(HashSet::new()));
    // Set by a visitor failure under `continue_on_failure = false`; the
    // main loop below is the only place that calls `walker.cancel()`, so
    // there's no need to share the walker itself across tasks.
    let halt = Arc::new(AtomicBool::new(false));

    let (mut walker, mut node_emitter) = Walker::new(graph.as_ref()).walk();
    let mut handles = FuturesUnordered::new();

    while let Some((idx, done)) = node_emitter.recv().await {
        if halt.load(Ordering::SeqCst) {
            walker.cancel().ok();
        }

        let node = graph[idx].clone();
        if node.is_root() {
            done.send(()).ok();
            continue;
        }
        let task_id = node
            .as_task_id()
            .expect("a non-root node always carries a TaskId")
            .clone();

        let dependency_failed = {
            let failed = failed_indices.lock().await;
            graph
                .neighbors_directed(idx, Direction::Outgoing)
                .any(|dep| failed.contains(&dep))
        };
        if dependency_failed {
            failed_indices.lock().await.insert(idx);
            report.lock().await.blocked.push(task_id);
            done.send(()).ok();
            continue;
        }

        let semaphore = semaphore.clone();
        let visitor = visitor.clone();
        let ui = ui.clone();
        let report = report.clone();
        let failed_indices = failed_indices.clone();
        let halt = halt.clone();
        let graph = graph.clone();
        let continue_on_failure = options.continue_on_failure;

        handles.push(tokio::spawn(async move {
            let _permit = match &semaphore {
                Some(sem) => Some(sem.acquire().await.expect("scheduler semaphore is never closed")),
                None => None,
            };
            let _keep_graph_alive = &graph;
            ui.task_started(&task_id);
            // `Visitor::visit` may block (spec §4.6); run it on the
            // blocking pool so a slow visitor can't starve the runtime's
            // worker threads out from under the walker's own driver tasks.
            let visit_result = {
                let visitor = visitor.clone();
                let task_id = task_id.clone();
                tokio::task::spawn_blocking(move || visitor.visit(&task_id))
                    .await
                    .expect("visitor task panicked")
            };
            match visit_result {
                Ok(()) => {
                    ui.task_finished(&task_id, true);
                    report.lock().await.succeeded.push(task_id);
                }
                Err(err) => {
                    ui.task_finished(&task_id, false);
                    failed_indices.lock().await.insert(idx);
                    report.lock().await.failed.push((task_id, err.to_string()));
                    if !continue_on_failure {
                        halt.store(true, Ordering::SeqCst);
                    }
                }
            }
            done.send(()).ok();
        }));
    }

    while handles.next().await.is_some() {}
    walker.wait().await.ok();

    Arc::try_unwrap(report)
        .expect("every spawned visit task has completed and dropped its report handle")
        .into_inner()
}
