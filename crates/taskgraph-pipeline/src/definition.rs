use taskgraph_task_id::validate_task_name;

use crate::{
    error::PipelineError,
    raw::{OutputMode, RawTaskDefinition},
};

/// The merged configuration for one task (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    /// Ordered dependency entries, each a bare task name, a
    /// package-qualified `pkg#task`, or a `^task` topological marker.
    pub task_dependencies: Vec<String>,
    /// Glob patterns; a leading `!` marks an exclusion.
    pub outputs: Vec<String>,
    pub cache: bool,
    pub persistent: bool,
    /// Whether the task may be torn down and restarted by a watch daemon
    /// without being treated as a failure (supplements the base data
    /// model; grounded in the teacher's `TaskDefinitionInfo` trait).
    pub interruptible: bool,
    pub interactive: bool,
    pub inputs: Vec<String>,
    pub env: Vec<String>,
    pub pass_through_env: Option<Vec<String>>,
    pub dot_env: Option<Vec<String>>,
    pub output_mode: OutputMode,
}

impl Default for TaskDefinition {
    fn default() -> Self {
        Self {
            task_dependencies: Vec::new(),
            outputs: Vec::new(),
            cache: true,
            persistent: false,
            interruptible: false,
            interactive: false,
            inputs: Vec::new(),
            env: Vec::new(),
            pass_through_env: None,
            dot_env: None,
            output_mode: OutputMode::default(),
        }
    }
}

impl TaskDefinition {
    /// Converts (and validates) a raw, wire-format definition. Unset raw
    /// fields are left `None` rather than defaulted here, so that
    /// [`crate::resolver::merge`] can tell "explicitly cleared" apart from
    /// "inherited" when folding a chain.
    pub fn from_raw(task_name: &str, raw: &RawTaskDefinition) -> Result<Self, PipelineError> {
        validate_task_name(task_name)
            .map_err(|_| PipelineError::ConfigNotFound { task_id: task_name.to_owned() })?;

        let interactive = raw.interactive.unwrap_or(false);
        let cache = raw.cache.unwrap_or(true);
        if interactive && cache {
            return Err(PipelineError::InteractiveCacheConflict {
                task: task_name.to_owned(),
            });
        }

        let persistent = raw.persistent.unwrap_or(false);
        let interruptible = raw.interruptible.unwrap_or(false);
        if interruptible && !persistent {
            return Err(PipelineError::InterruptibleRequiresPersistent {
                task: task_name.to_owned(),
            });
        }

        let mut task_dependencies = raw.depends_on.clone().unwrap_or_default();
        task_dependencies.sort();

        // Declared order is preserved: the fingerprinter reads `outputs` as
        // a canonical hash input (spec §4.5 item 5), so reordering the same
        // globs must change the hash.
        let outputs = raw.outputs.clone().unwrap_or_default();

        Ok(Self {
            task_dependencies,
            outputs,
            cache,
            persistent,
            interruptible,
            interactive,
            inputs: raw.inputs.clone().unwrap_or_default(),
            env: raw.env.clone().unwrap_or_default(),
            pass_through_env: raw.pass_through_env.clone(),
            dot_env: raw.dot_env.clone(),
            output_mode: raw.output_mode.unwrap_or_default(),
        })
    }
}

/// One link of the merge chain: an *unvalidated* raw definition plus
/// provenance, kept around through the whole chain so the fold in
/// [`crate::resolver::merge_chain`] can tell "this field was never set"
/// apart from "this field was set to its default", and so merge conflicts
/// and error messages can name a source file (spec §3, §7).
#[derive(Debug, Clone, PartialEq)]
pub struct BookkeepingTaskDefinition {
    pub raw: RawTaskDefinition,
    /// e.g. `"turbo.json"` or `"libA/turbo.json"`.
    pub source: String,
    /// Whether this task was registered root-enabled, i.e. declared under
    /// an explicit `pkg#task` key in the root pipeline rather than a bare
    /// name — required before a root-package entry task may be scheduled
    /// (spec §4.4).
    pub root_enabled: bool,
}
