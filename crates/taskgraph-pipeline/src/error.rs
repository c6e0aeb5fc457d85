use miette::{Diagnostic, NamedSource};
use taskgraph_errors::TASKGRAPH_SITE;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("malformed turbo.json")]
    #[diagnostic(code(taskgraph::config::invalid))]
    Json {
        #[source]
        source: serde_json::Error,
        #[source_code]
        source_code: NamedSource,
    },

    #[error("failed to read `{path}`: {source}")]
    #[diagnostic(code(taskgraph::config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no task definition found for `{task_id}`")]
    #[diagnostic(
        code(taskgraph::config::not_found),
        url("{TASKGRAPH_SITE}/errors/missing-task")
    )]
    ConfigNotFound { task_id: String },

    #[error("workspace config for `{package}` must extend the root, found {found:?}")]
    #[diagnostic(
        code(taskgraph::config::invalid_extends),
        url("{TASKGRAPH_SITE}/errors/invalid-extends")
    )]
    MustExtendRoot { package: String, found: Vec<String> },

    #[error("workspace config for `{0}` may not use a package-qualified pipeline key")]
    #[diagnostic(code(taskgraph::config::qualified_key_in_workspace))]
    QualifiedKeyInWorkspaceConfig(String),

    #[error("task `{task}` sets both `interactive` and `cache`; interactive tasks cannot be cached")]
    #[diagnostic(code(taskgraph::config::interactive_cache_conflict))]
    InteractiveCacheConflict { task: String },

    #[error("task `{task}` sets `interruptible` but is not `persistent`")]
    #[diagnostic(code(taskgraph::config::interruptible_not_persistent))]
    InterruptibleRequiresPersistent { task: String },
}

pub(crate) fn json_error(source: serde_json::Error, path: &str, text: &str) -> PipelineError {
    PipelineError::Json {
        source,
        source_code: NamedSource::new(path, text.to_owned()),
    }
}
