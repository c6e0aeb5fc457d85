//! A demonstration [`Visitor`]/[`Ui`] pair. Real process execution, caching,
//! and terminal rendering are collaborator concerns left to an embedder
//! (spec §1's Non-goals); this binary only needs to prove the wiring from
//! selectors down to a scheduled visit, so it logs instead of spawning.

use std::sync::atomic::{AtomicUsize, Ordering};

use taskgraph_exec::{Ui, Visitor, VisitorError};
use taskgraph_task_id::TaskId;

pub struct LoggingVisitor {
    visited: AtomicUsize,
}

impl LoggingVisitor {
    pub fn new() -> Self {
        Self {
            visited: AtomicUsize::new(0),
        }
    }

    pub fn visited_count(&self) -> usize {
        self.visited.load(Ordering::SeqCst)
    }
}

impl Visitor for LoggingVisitor {
    fn visit(&self, task_id: &TaskId<'static>) -> Result<(), VisitorError> {
        tracing::info!(task = %task_id, "running task");
        self.visited.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct LoggingUi;

impl Ui for LoggingUi {
    fn task_started(&self, task_id: &TaskId<'static>) {
        tracing::debug!(task = %task_id, "started");
    }

    fn task_finished(&self, task_id: &TaskId<'static>, succeeded: bool) {
        if succeeded {
            tracing::info!(task = %task_id, "finished");
        } else {
            tracing::warn!(task = %task_id, "failed");
        }
    }
}
