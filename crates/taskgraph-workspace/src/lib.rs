//! The Workspace Model (C1): an immutable view of packages and the
//! workspace graph, built once from filesystem inputs at startup and
//! shared read-only across the scheduler's workers thereafter.

use std::collections::{HashMap, HashSet};

use camino::Utf8PathBuf;
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{Dfs, Reversed},
    Direction,
};
use taskgraph_task_id::{PackageName, ROOT_PKG_NAME};
use thiserror::Error;

/// One workspace member: the repo root itself, or a named package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: PackageName,
    /// Directory relative to the repo root; the root package uses `"."`.
    pub dir: Utf8PathBuf,
    pub scripts: HashMap<String, String>,
    pub internal_dependencies: HashSet<PackageName>,
    /// Opaque fingerprint of external (non-workspace) dependencies,
    /// typically derived from a lockfile entry by the caller; the
    /// lockfile/package-manager discovery code that produces it is out of
    /// scope for this crate (see spec §1).
    pub external_dependency_fingerprint: String,
    /// Content hash over the package's files, computed by the injected
    /// `FileHasher` collaborator (see `taskgraph-engine::FileHasher`).
    pub content_hash: String,
}

impl Package {
    pub fn root(content_hash: impl Into<String>) -> Self {
        Self {
            name: PackageName::Root,
            dir: Utf8PathBuf::from("."),
            scripts: HashMap::new(),
            internal_dependencies: HashSet::new(),
            external_dependency_fingerprint: String::new(),
            content_hash: content_hash.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("package `{0}` not found in workspace")]
    NotFound(String),
    #[error("duplicate package name `{0}`")]
    DuplicatePackage(String),
    #[error("package `{from}` depends on unknown package `{to}`")]
    UnknownDependency { from: String, to: String },
}

/// An acyclic directed graph over package names; an edge A→B means "A
/// depends on B". Immutable after construction via [`WorkspaceGraphBuilder`].
#[derive(Debug, Clone)]
pub struct WorkspaceGraph {
    packages: HashMap<PackageName, Package>,
    graph: DiGraph<PackageName, ()>,
    indices: HashMap<PackageName, NodeIndex>,
    single_package: bool,
}

impl WorkspaceGraph {
    pub fn builder() -> WorkspaceGraphBuilder {
        WorkspaceGraphBuilder::default()
    }

    pub fn is_single_package(&self) -> bool {
        self.single_package
    }

    pub fn package(&self, name: &PackageName) -> Result<&Package, WorkspaceError> {
        self.packages
            .get(name)
            .ok_or_else(|| WorkspaceError::NotFound(name.as_str().to_owned()))
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn contains(&self, name: &PackageName) -> bool {
        self.packages.contains_key(name)
    }

    /// Direct workspace-graph dependencies: packages that `pkg` depends on.
    pub fn children(&self, pkg: &PackageName) -> Vec<&PackageName> {
        let Some(&idx) = self.indices.get(pkg) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Direct dependents: packages that depend on `pkg`.
    pub fn parents(&self, pkg: &PackageName) -> Vec<&PackageName> {
        let Some(&idx) = self.indices.get(pkg) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Transitive dependencies, ordering unspecified but deterministic
    /// (DFS post-order over sorted neighbour lists).
    pub fn descendants(&self, pkg: &PackageName) -> Vec<&PackageName> {
        self.transitive(pkg, Direction::Outgoing)
    }

    /// Transitive dependents.
    pub fn ancestors(&self, pkg: &PackageName) -> Vec<&PackageName> {
        self.transitive(pkg, Direction::Incoming)
    }

    fn transitive(&self, pkg: &PackageName, direction: Direction) -> Vec<&PackageName> {
        let Some(&start) = self.indices.get(pkg) else {
            return Vec::new();
        };
        let mut seen = Vec::new();
        match direction {
            Direction::Outgoing => {
                let mut dfs = Dfs::new(&self.graph, start);
                dfs.next(&self.graph); // skip the start node itself
                while let Some(n) = dfs.next(&self.graph) {
                    seen.push(&self.graph[n]);
                }
            }
            Direction::Incoming => {
                let reversed = Reversed(&self.graph);
                let mut dfs = Dfs::new(&reversed, start);
                dfs.next(&reversed);
                while let Some(n) = dfs.next(&reversed) {
                    seen.push(&self.graph[n]);
                }
            }
        }
        seen
    }
}

/// Builds a [`WorkspaceGraph`], validating that every declared dependency
/// names a package also added to the builder.
#[derive(Default)]
pub struct WorkspaceGraphBuilder {
    packages: HashMap<PackageName, Package>,
    single_package: bool,
}

impl WorkspaceGraphBuilder {
    pub fn single_package(mut self, single_package: bool) -> Self {
        self.single_package = single_package;
        self
    }

    pub fn add_package(mut self, package: Package) -> Result<Self, WorkspaceError> {
        if self.packages.contains_key(&package.name) {
            return Err(WorkspaceError::DuplicatePackage(
                package.name.as_str().to_owned(),
            ));
        }
        self.packages.insert(package.name.clone(), package);
        Ok(self)
    }

    pub fn build(self) -> Result<WorkspaceGraph, WorkspaceError> {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();
        for name in self.packages.keys() {
            indices.insert(name.clone(), graph.add_node(name.clone()));
        }
        for package in self.packages.values() {
            let from_idx = indices[&package.name];
            for dep in &package.internal_dependencies {
                let to_idx = indices.get(dep).ok_or_else(|| WorkspaceError::UnknownDependency {
                    from: package.name.as_str().to_owned(),
                    to: dep.as_str().to_owned(),
                })?;
                graph.add_edge(from_idx, *to_idx, ());
            }
        }
        if !self.packages.contains_key(&PackageName::Root) {
            tracing::debug!(
                root = ROOT_PKG_NAME,
                "workspace built without an explicit root package entry"
            );
        }
        Ok(WorkspaceGraph {
            packages: self.packages,
            graph,
            indices,
            single_package: self.single_package,
        })
    }
}
