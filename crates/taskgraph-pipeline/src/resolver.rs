use taskgraph_task_id::{PackageName, ROOT_PKG_NAME};

use crate::{
    definition::{BookkeepingTaskDefinition, TaskDefinition},
    error::PipelineError,
    loader::TurboJsonLoader,
    raw::RawTaskDefinition,
};

/// The Pipeline Resolver (C2): for a given package and task name, returns
/// the ordered chain of [`BookkeepingTaskDefinition`]s to merge, and folds
/// that chain into one effective [`TaskDefinition`].
pub struct PipelineResolver<'a, L: TurboJsonLoader> {
    loader: &'a L,
    single_package: bool,
}

impl<'a, L: TurboJsonLoader> PipelineResolver<'a, L> {
    pub fn new(loader: &'a L, single_package: bool) -> Self {
        Self {
            loader,
            single_package,
        }
    }

    /// Implements spec §4.2's `resolve_chain`.
    #[tracing::instrument(skip(self), fields(%pkg, task_name))]
    pub fn resolve_chain(
        &self,
        pkg: &PackageName,
        task_name: &str,
    ) -> Result<Vec<BookkeepingTaskDefinition>, PipelineError> {
        let mut chain = Vec::new();

        // Step 1: the root pipeline, trying the qualified id first.
        if let Some(root_raw) = self.loader.load(&PackageName::Root)? {
            let qualified_key = format!("{pkg}#{task_name}");
            if let Some(def) = root_raw.pipeline.get(&qualified_key) {
                chain.push(BookkeepingTaskDefinition {
                    raw: def.clone(),
                    source: "turbo.json".to_owned(),
                    root_enabled: true,
                });
            } else if let Some(def) = root_raw.pipeline.get(task_name) {
                chain.push(BookkeepingTaskDefinition {
                    raw: def.clone(),
                    source: "turbo.json".to_owned(),
                    root_enabled: false,
                });
            }
        }

        if pkg.is_root() {
            if chain.is_empty() {
                return Err(PipelineError::ConfigNotFound {
                    task_id: format!("{ROOT_PKG_NAME}#{task_name}"),
                });
            }
            return Ok(chain);
        }

        // Step 2: the workspace-local pipeline, if any.
        match self.loader.load(pkg)? {
            Some(workspace_raw) => {
                let extends = workspace_raw.extends.clone().unwrap_or_default();
                if extends != vec![ROOT_PKG_NAME.to_string()] {
                    return Err(PipelineError::MustExtendRoot {
                        package: pkg.as_str().to_owned(),
                        found: extends,
                    });
                }
                if workspace_raw.pipeline.keys().any(|k| k.contains('#')) {
                    return Err(PipelineError::QualifiedKeyInWorkspaceConfig(
                        pkg.as_str().to_owned(),
                    ));
                }
                if let Some(def) = workspace_raw.pipeline.get(task_name) {
                    chain.push(BookkeepingTaskDefinition {
                        raw: def.clone(),
                        source: format!("{pkg}/turbo.json"),
                        root_enabled: false,
                    });
                }
            }
            None if self.single_package => {
                // The root *is* the workspace; its contribution (already
                // pushed above, if any) is the sole entry.
            }
            None => {
                // No workspace-local config: this workspace contributes
                // nothing beyond whatever the root already supplied.
            }
        }

        if chain.is_empty() {
            return Err(PipelineError::ConfigNotFound {
                task_id: format!("{pkg}#{task_name}"),
            });
        }
        Ok(chain)
    }

    /// Folds a resolved chain into the effective [`TaskDefinition`] (spec
    /// §4.2's `merge`): later entries override earlier ones field-by-field,
    /// and for list-valued fields this is a *replace*, not an append.
    pub fn merge(
        &self,
        task_name: &str,
        chain: &[BookkeepingTaskDefinition],
    ) -> Result<TaskDefinition, PipelineError> {
        let merged = chain
            .iter()
            .fold(RawTaskDefinition::default(), |acc, link| merge_raw(acc, &link.raw));
        TaskDefinition::from_raw(task_name, &merged)
    }
}

/// `later` overrides `earlier` field-by-field; `Some` always wins over
/// `None`, and a list field set to `Some(vec)` replaces the earlier list
/// wholesale rather than extending it (spec §4.2, decided: replace).
fn merge_raw(earlier: RawTaskDefinition, later: &RawTaskDefinition) -> RawTaskDefinition {
    RawTaskDefinition {
        depends_on: later.depends_on.clone().or(earlier.depends_on),
        outputs: later.outputs.clone().or(earlier.outputs),
        cache: later.cache.or(earlier.cache),
        persistent: later.persistent.or(earlier.persistent),
        interruptible: later.interruptible.or(earlier.interruptible),
        interactive: later.interactive.or(earlier.interactive),
        inputs: later.inputs.clone().or(earlier.inputs),
        env: later.env.clone().or(earlier.env),
        pass_through_env: later.pass_through_env.clone().or(earlier.pass_through_env),
        dot_env: later.dot_env.clone().or(earlier.dot_env),
        output_mode: later.output_mode.or(earlier.output_mode),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{loader::MemoryTurboJsonLoader, raw::RawTurboJson};

    fn root_config() -> RawTurboJson {
        RawTurboJson {
            pipeline: HashMap::from([
                (
                    "build".to_string(),
                    RawTaskDefinition {
                        depends_on: Some(vec!["^build".to_string()]),
                        ..Default::default()
                    },
                ),
                (
                    "test".to_string(),
                    RawTaskDefinition {
                        depends_on: Some(vec!["build".to_string()]),
                        ..Default::default()
                    },
                ),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn root_only_contribution_when_no_workspace_config() {
        let loader = MemoryTurboJsonLoader::new().with_config(PackageName::Root, root_config());
        let resolver = PipelineResolver::new(&loader, false);
        let chain = resolver
            .resolve_chain(&PackageName::from("libA"), "build")
            .unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].source, "turbo.json");
    }

    #[test]
    fn workspace_override_replaces_not_appends() {
        let loader = MemoryTurboJsonLoader::new()
            .with_config(PackageName::Root, root_config())
            .with_config(
                PackageName::from("libA"),
                RawTurboJson {
                    extends: Some(vec!["//".to_string()]),
                    pipeline: HashMap::from([(
                        "build".to_string(),
                        RawTaskDefinition {
                            depends_on: Some(vec!["libB#build".to_string()]),
                            ..Default::default()
                        },
                    )]),
                    ..Default::default()
                },
            );
        let resolver = PipelineResolver::new(&loader, false);
        let chain = resolver
            .resolve_chain(&PackageName::from("libA"), "build")
            .unwrap();
        let merged = resolver.merge("build", &chain).unwrap();
        assert_eq!(merged.task_dependencies, vec!["libB#build".to_string()]);
    }

    #[test]
    fn workspace_extending_non_root_is_rejected() {
        let loader = MemoryTurboJsonLoader::new()
            .with_config(PackageName::Root, root_config())
            .with_config(
                PackageName::from("libA"),
                RawTurboJson {
                    extends: Some(vec!["libB".to_string()]),
                    pipeline: HashMap::new(),
                    ..Default::default()
                },
            );
        let resolver = PipelineResolver::new(&loader, false);
        let err = resolver
            .resolve_chain(&PackageName::from("libA"), "build")
            .unwrap_err();
        assert!(matches!(err, PipelineError::MustExtendRoot { .. }));
    }

    #[test]
    fn single_package_repo_uses_root_pipeline_directly() {
        let loader = MemoryTurboJsonLoader::new().with_config(PackageName::Root, root_config());
        let resolver = PipelineResolver::new(&loader, true);
        let chain = resolver
            .resolve_chain(&PackageName::Root, "test")
            .unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn missing_entry_anywhere_in_chain_is_an_error() {
        let loader = MemoryTurboJsonLoader::new().with_config(PackageName::Root, root_config());
        let resolver = PipelineResolver::new(&loader, false);
        let err = resolver
            .resolve_chain(&PackageName::from("libA"), "lint")
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigNotFound { .. }));
    }
}
