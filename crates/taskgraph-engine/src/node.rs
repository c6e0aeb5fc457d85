use std::fmt;

use taskgraph_task_id::TaskId;

/// One vertex of the task graph: either a concrete task, or the synthetic
/// root every entry-less task is wired to so the graph has a single sink
/// (spec §4.4, §9 — the root sentinel is deliberately not representable as
/// a [`TaskId`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskNode {
    Root,
    Task(TaskId<'static>),
}

impl TaskNode {
    pub fn as_task_id(&self) -> Option<&TaskId<'static>> {
        match self {
            TaskNode::Root => None,
            TaskNode::Task(id) => Some(id),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, TaskNode::Root)
    }
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskNode::Root => f.write_str("___ROOT___"),
            TaskNode::Task(id) => write!(f, "{id}"),
        }
    }
}
