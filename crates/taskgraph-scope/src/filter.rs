use std::collections::HashSet;

use miette::Diagnostic;
use taskgraph_task_id::PackageName;
use taskgraph_workspace::WorkspaceGraph;
use thiserror::Error;

use crate::{
    selector::TargetSelector,
    simple_glob::{Match, SimpleGlob},
};

#[derive(Debug, Error, Diagnostic)]
pub enum ScopeError {
    #[error(transparent)]
    #[diagnostic(code(taskgraph::scope::invalid_glob))]
    InvalidGlob(#[from] regex::Error),
    #[error("SCM probe failed: {0}")]
    #[diagnostic(code(taskgraph::scope::scm_failed))]
    Scm(String),
}

/// The change-based selection capability consumed by the Filter (spec
/// §4.3): given a ref range, returns the set of packages attributed to
/// files changed in that range. File-to-package attribution (longest
/// directory-prefix match) and global-dependency-glob short-circuiting
/// (a changed `turbo.json`/lockfile marks every package changed) are the
/// responsibility of the implementation of this trait, not the Filter
/// itself — the Filter only consumes the resulting package set.
pub trait PackagesChangedInRange {
    fn changed_packages(
        &self,
        from_ref: Option<&str>,
        to_ref: Option<&str>,
    ) -> Result<HashSet<PackageName>, ScopeError>;
}

/// Translates a set of selectors into an entry set of package names (C3).
pub struct FilterResolver<'a> {
    workspace: &'a WorkspaceGraph,
}

impl<'a> FilterResolver<'a> {
    pub fn new(workspace: &'a WorkspaceGraph) -> Self {
        Self { workspace }
    }

    /// Returns `(packages, is_all_packages)`; `is_all_packages` is true iff
    /// no selector was supplied (spec §4.3).
    #[tracing::instrument(skip(self, changed))]
    pub fn resolve(
        &self,
        selectors: &[TargetSelector],
        changed: &dyn PackagesChangedInRange,
    ) -> Result<(HashSet<PackageName>, bool), ScopeError> {
        if selectors.is_empty() {
            return Ok((self.all_packages(), true));
        }

        let mut included = HashSet::new();
        let mut excluded = HashSet::new();
        for selector in selectors {
            let matched = self.resolve_selector(selector, changed)?;
            if selector.exclude {
                excluded.extend(matched);
            } else {
                included.extend(matched);
            }
        }

        let result = included.difference(&excluded).cloned().collect();
        Ok((result, false))
    }

    fn resolve_selector(
        &self,
        selector: &TargetSelector,
        changed: &dyn PackagesChangedInRange,
    ) -> Result<HashSet<PackageName>, ScopeError> {
        let mut matched = if selector.is_selector_by_change() {
            changed.changed_packages(selector.from_ref.as_deref(), selector.to_ref.as_deref())?
        } else {
            self.all_packages()
        };

        if let Some(pattern) = &selector.name_pattern {
            let glob = SimpleGlob::new(pattern)?;
            matched.retain(|pkg| glob.is_match(pkg.as_str()));
        }

        if let Some(dir) = &selector.parent_dir {
            let under_dir: HashSet<PackageName> = self
                .workspace
                .packages()
                .filter(|p| p.dir.as_str() == dir.as_str() || p.dir.as_str().starts_with(&format!("{dir}/")))
                .map(|p| p.name.clone())
                .collect();
            matched.retain(|pkg| under_dir.contains(pkg));
        }

        if selector.include_dependents {
            let mut expanded = matched.clone();
            for pkg in &matched {
                expanded.extend(self.workspace.ancestors(pkg).into_iter().cloned());
            }
            matched = expanded;
        }

        if selector.include_dependencies {
            let mut expanded = matched.clone();
            for pkg in &matched {
                expanded.extend(self.workspace.descendants(pkg).into_iter().cloned());
            }
            matched = expanded;
        }

        Ok(matched)
    }

    fn all_packages(&self) -> HashSet<PackageName> {
        self.workspace.packages().map(|p| p.name.clone()).collect()
    }
}
