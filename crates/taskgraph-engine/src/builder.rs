use std::collections::{HashSet, VecDeque};

use taskgraph_pipeline::{PipelineError, PipelineResolver, TurboJsonLoader};
use taskgraph_task_id::{DependencyRef, PackageName, TaskId};
use taskgraph_workspace::WorkspaceGraph;

use crate::{
    engine::{Building, Built, Engine},
    error::BuilderError,
    node::TaskNode,
};

/// Assembles an [`Engine<Built>`] from a set of `(package, task)` entry
/// points by BFS expansion of `dependsOn` edges (spec §4.4).
pub struct GraphBuilder<'a, L: TurboJsonLoader> {
    workspace: &'a WorkspaceGraph,
    resolver: PipelineResolver<'a, L>,
    /// When set, a dependency edge is only kept if its task name also
    /// appears among the original entry tasks (spec §4.4 step 4).
    tasks_only: bool,
    /// Out-of-band `from -> to` package-task edges (spec §4.4 step 6): an
    /// inter-task ordering not expressible via `dependsOn` in config.
    /// Applied with the same add-and-enqueue logic as config-derived
    /// dependencies, once `build` reaches `from` in the walk.
    extra_edges: Vec<(TaskId<'static>, TaskId<'static>)>,
}

impl<'a, L: TurboJsonLoader> GraphBuilder<'a, L> {
    pub fn new(workspace: &'a WorkspaceGraph, loader: &'a L, tasks_only: bool) -> Self {
        Self {
            workspace,
            resolver: PipelineResolver::new(loader, workspace.is_single_package()),
            tasks_only,
            extra_edges: Vec::new(),
        }
    }

    /// Registers an explicit `from -> to` task dependency outside of any
    /// `turbo.json` config (spec §4.4 step 6). `from` depends on `to`: when
    /// `build` reaches `from`, `to` is added and enqueued exactly as a
    /// config-derived dependency would be.
    pub fn with_extra_dependency(mut self, from: TaskId<'static>, to: TaskId<'static>) -> Self {
        self.extra_edges.push((from, to));
        self
    }

    #[tracing::instrument(skip(self, entries))]
    pub fn build(&self, entries: &[(PackageName, String)]) -> Result<Engine<Built>, BuilderError> {
        let mut engine = Engine::<Building>::new();
        let mut queue: VecDeque<TaskId<'static>> = VecDeque::new();
        let entry_task_names: HashSet<&str> = entries.iter().map(|(_, t)| t.as_str()).collect();

        for (pkg, task_name) in entries {
            // An entry task that isn't defined anywhere is silently
            // skipped, unlike a missing dependency, which is an error
            // (spec §4.4, §7: "entry tasks may be silently skipped when
            // undefined").
            let chain = match self.resolver.resolve_chain(pkg, task_name) {
                Ok(chain) => chain,
                Err(PipelineError::ConfigNotFound { .. }) => continue,
                Err(other) => return Err(other.into()),
            };
            if pkg.is_root() && !chain.iter().any(|link| link.root_enabled) {
                return Err(BuilderError::RootTaskNotEnabled(format!("{pkg}#{task_name}")));
            }
            queue.push_back(TaskId::new(pkg.clone(), task_name.clone()));
        }

        let mut visited: HashSet<TaskId<'static>> = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if visited.contains(&id) {
                continue;
            }
            visited.insert(id.clone());

            let pkg = PackageName::from(id.package());
            let chain = self
                .resolver
                .resolve_chain(&pkg, id.task())
                .map_err(|_| BuilderError::MissingTaskDefinition(id.to_string()))?;
            let definition = self.resolver.merge(id.task(), &chain)?;

            let to_node = TaskNode::Task(id.clone());
            let to_idx = engine.get_or_add_index(to_node);
            engine.add_definition(id.clone(), definition.clone());

            let mut linked_any = false;
            for dep_raw in &definition.task_dependencies {
                for from_id in self.expand_dependency(&pkg, dep_raw)? {
                    if self.tasks_only && !entry_task_names.contains(from_id.task()) {
                        continue;
                    }
                    let from_node = TaskNode::Task(from_id.clone());
                    let from_idx = engine.get_or_add_index(from_node);
                    engine.add_dependency(to_idx, from_idx);
                    linked_any = true;
                    queue.push_back(from_id);
                }
            }

            for (_, dep_id) in self.extra_edges.iter().filter(|(from, _)| *from == id) {
                if self.tasks_only && !entry_task_names.contains(dep_id.task()) {
                    continue;
                }
                let dep_node = TaskNode::Task(dep_id.clone());
                let dep_idx = engine.get_or_add_index(dep_node);
                engine.add_dependency(to_idx, dep_idx);
                linked_any = true;
                queue.push_back(dep_id.clone());
            }

            if !linked_any {
                engine.connect_to_root(to_idx);
            }
        }

        engine.seal()
    }

    /// Expands one `dependsOn` entry into the concrete task ids it refers
    /// to. A topological (`^task`) entry silently drops any workspace-graph
    /// child that has no definition for that task — not every child
    /// necessarily runs every task — but a bare or package-qualified entry
    /// must resolve to a real task definition, or it's a
    /// [`BuilderError::MissingTaskDefinition`].
    fn expand_dependency(
        &self,
        current_package: &PackageName,
        raw: &str,
    ) -> Result<Vec<TaskId<'static>>, BuilderError> {
        match DependencyRef::parse(raw) {
            DependencyRef::Topological(name) => Ok(self
                .workspace
                .children(current_package)
                .into_iter()
                .filter(|child| self.resolver.resolve_chain(child, name.task()).is_ok())
                .map(|child| TaskId::new(child.clone(), name.task().to_owned()))
                .collect()),
            DependencyRef::Qualified(name) => {
                let dep_pkg =
                    PackageName::from(name.package().expect("a qualified name always has a package"));
                if !dep_pkg.is_root() && !self.workspace.contains(&dep_pkg) {
                    return Err(BuilderError::UnknownPackage(dep_pkg.as_str().to_owned()));
                }
                let id = TaskId::new(dep_pkg.clone(), name.task().to_owned());
                self.resolver
                    .resolve_chain(&dep_pkg, name.task())
                    .map_err(|_| BuilderError::MissingTaskDefinition(id.to_string()))?;
                Ok(vec![id])
            }
            DependencyRef::Bare(name) => {
                let id = TaskId::new(current_package.clone(), name.task().to_owned());
                self.resolver
                    .resolve_chain(current_package, name.task())
                    .map_err(|_| BuilderError::MissingTaskDefinition(id.to_string()))?;
                Ok(vec![id])
            }
        }
    }
}
