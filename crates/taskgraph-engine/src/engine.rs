use std::{
    collections::{HashMap, HashSet},
    marker::PhantomData,
};

use petgraph::{
    graph::{DiGraph, NodeIndex},
    Direction,
};
use taskgraph_graph_utils::{transitive_closure_backward, transitive_closure_forward, validate_acyclic};
use taskgraph_pipeline::TaskDefinition;
use taskgraph_task_id::{PackageName, TaskId};

use crate::{error::BuilderError, node::TaskNode};

/// Typestate marker: the graph is still being assembled by
/// [`crate::builder::GraphBuilder`] and has not yet been validated.
#[derive(Debug)]
pub struct Building;

/// Typestate marker: the graph has passed acyclicity and persistent-dependency
/// validation and may be queried and scheduled.
#[derive(Debug)]
pub struct Built;

/// The Task Graph (C4's product): a DAG of [`TaskNode`]s rooted at a synthetic
/// [`TaskNode::Root`], assembled once per run by [`crate::builder::GraphBuilder`]
/// and immutable thereafter (spec §4.4, §9).
pub struct Engine<S = Built> {
    pub(crate) graph: DiGraph<TaskNode, ()>,
    pub(crate) indices: HashMap<TaskNode, NodeIndex>,
    pub(crate) definitions: HashMap<TaskId<'static>, TaskDefinition>,
    pub(crate) root_index: NodeIndex,
    marker: PhantomData<S>,
}

impl Engine<Building> {
    pub(crate) fn new() -> Self {
        let mut graph = DiGraph::new();
        let root_index = graph.add_node(TaskNode::Root);
        let mut indices = HashMap::new();
        indices.insert(TaskNode::Root, root_index);
        Self {
            graph,
            indices,
            definitions: HashMap::new(),
            root_index,
            marker: PhantomData,
        }
    }

    pub(crate) fn get_or_add_index(&mut self, node: TaskNode) -> NodeIndex {
        if let Some(&idx) = self.indices.get(&node) {
            return idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.indices.insert(node, idx);
        idx
    }

    pub(crate) fn add_definition(&mut self, id: TaskId<'static>, definition: TaskDefinition) {
        self.definitions.insert(id, definition);
    }

    pub(crate) fn add_dependency(&mut self, from: NodeIndex, to: NodeIndex) {
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub(crate) fn connect_to_root(&mut self, node: NodeIndex) {
        let root = self.root_index;
        self.add_dependency(node, root);
    }

    pub(crate) fn has_outgoing(&self, node: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .is_some()
    }

    /// Validates the assembled graph and seals it: acyclic (spec §4.4), and
    /// no edge depends on a persistent task (spec §3's persistent-dependency
    /// invariant).
    pub(crate) fn seal(self) -> Result<Engine<Built>, BuilderError> {
        validate_acyclic(&self.graph).map_err(|cycle| BuilderError::Cycle(cycle.describe()))?;
        check_persistent_dependencies(&self)?;
        Ok(Engine {
            graph: self.graph,
            indices: self.indices,
            definitions: self.definitions,
            root_index: self.root_index,
            marker: PhantomData,
        })
    }
}

fn check_persistent_dependencies<S>(engine: &Engine<S>) -> Result<(), BuilderError> {
    for edge in engine.graph.edge_indices() {
        let (from, to) = engine
            .graph
            .edge_endpoints(edge)
            .expect("edge index came from this graph");
        let TaskNode::Task(dep_id) = &engine.graph[to] else {
            continue;
        };
        let Some(dep_def) = engine.definitions.get(dep_id) else {
            continue;
        };
        if dep_def.persistent {
            if let TaskNode::Task(consumer_id) = &engine.graph[from] {
                return Err(BuilderError::PersistentDependencyViolation {
                    consumer: consumer_id.to_string(),
                    dependency: dep_id.to_string(),
                });
            }
        }
    }
    Ok(())
}

impl Engine<Built> {
    pub fn definition(&self, id: &TaskId<'_>) -> Option<&TaskDefinition> {
        self.definitions.get(&id.clone().into_owned())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.graph.node_weights()
    }

    /// Every `(from, to)` edge, `from` depending on `to` — the shape the
    /// Scheduler/Walker consumes to compute in-degrees (spec §5).
    pub fn edges(&self) -> impl Iterator<Item = (&TaskNode, &TaskNode)> {
        self.graph.edge_indices().map(move |e| {
            let (from, to) = self
                .graph
                .edge_endpoints(e)
                .expect("edge index came from this graph");
            (&self.graph[from], &self.graph[to])
        })
    }

    pub fn dependencies(&self, node: &TaskNode) -> Vec<&TaskNode> {
        self.neighbors(node, Direction::Outgoing)
    }

    pub fn dependents(&self, node: &TaskNode) -> Vec<&TaskNode> {
        self.neighbors(node, Direction::Incoming)
    }

    fn neighbors(&self, node: &TaskNode, direction: Direction) -> Vec<&TaskNode> {
        let Some(&idx) = self.indices.get(node) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .map(|n| &self.graph[n])
            .collect()
    }

    pub fn transitive_dependencies(&self, node: &TaskNode) -> Vec<&TaskNode> {
        let Some(&idx) = self.indices.get(node) else {
            return Vec::new();
        };
        transitive_closure_forward(&self.graph, idx)
            .into_iter()
            .map(|n| &self.graph[n])
            .collect()
    }

    pub fn transitive_dependents(&self, node: &TaskNode) -> Vec<&TaskNode> {
        let Some(&idx) = self.indices.get(node) else {
            return Vec::new();
        };
        transitive_closure_backward(&self.graph, idx)
            .into_iter()
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Every task whose dependency set is rooted in one of `packages` — the
    /// package itself's tasks, plus everything that transitively depends on
    /// them. This is the set a watch daemon must re-run after a change to
    /// any of `packages` (spec §4.4 supplement).
    pub fn tasks_impacted_by_packages(&self, packages: &HashSet<PackageName>) -> HashSet<TaskNode> {
        let mut impacted = HashSet::new();
        for node in self.nodes() {
            if let TaskNode::Task(id) = node {
                if packages.iter().any(|p| p.as_str() == id.package()) {
                    impacted.insert(node.clone());
                    impacted.extend(self.transitive_dependents(node).into_iter().cloned());
                }
            }
        }
        impacted
    }

    /// Derives a new, independently-sealed engine over only the nodes for
    /// which `keep` holds (plus the root). Nodes left without a surviving
    /// outgoing edge are reconnected to the root, exactly as the top-level
    /// build does (spec §4.4 supplement: subgraph derivation for watch mode,
    /// grounded in the teacher's `create_engine_for_subgraph` family).
    fn induced_subgraph(&self, keep: impl Fn(&TaskNode) -> bool) -> Engine<Built> {
        let mut building = Engine::<Building>::new();
        for node in self.nodes() {
            if let TaskNode::Task(id) = node {
                if keep(node) {
                    building.get_or_add_index(node.clone());
                    if let Some(def) = self.definitions.get(id) {
                        building.add_definition(id.clone(), def.clone());
                    }
                }
            }
        }
        for (from, to) in self.edges() {
            if keep(from) && (to.is_root() || keep(to)) {
                let from_idx = building.get_or_add_index(from.clone());
                let to_idx = building.get_or_add_index(to.clone());
                building.add_dependency(from_idx, to_idx);
            }
        }
        for node in self.nodes() {
            if keep(node) {
                let idx = building.indices[node];
                if !building.has_outgoing(idx) {
                    building.connect_to_root(idx);
                }
            }
        }
        building.seal().expect(
            "a node/edge-induced subgraph of an already-validated engine cannot introduce a cycle or a persistent-dependency violation",
        )
    }

    /// The subgraph reachable backward from the tasks belonging to `changed`
    /// packages: those tasks, plus everything that (transitively) depends on
    /// them.
    pub fn create_engine_for_subgraph(&self, changed: &HashSet<PackageName>) -> Engine<Built> {
        let impacted = self.tasks_impacted_by_packages(changed);
        self.induced_subgraph(|node| impacted.contains(node))
    }

    /// The subgraph containing only persistent, interruptible tasks — the
    /// long-running dev-server processes a watch daemon is allowed to tear
    /// down and restart without treating the restart as a failure.
    pub fn create_engine_for_interruptible_tasks(&self) -> Engine<Built> {
        self.induced_subgraph(|node| match node {
            TaskNode::Task(id) => self.definitions.get(id).is_some_and(|d| d.interruptible),
            TaskNode::Root => false,
        })
    }

    /// The complement of [`Self::create_engine_for_interruptible_tasks`]:
    /// every task that is not a persistent, interruptible task.
    pub fn create_engine_for_non_interruptible_tasks(&self) -> Engine<Built> {
        self.induced_subgraph(|node| match node {
            TaskNode::Task(id) => !self.definitions.get(id).is_some_and(|d| d.interruptible),
            TaskNode::Root => false,
        })
    }
}
