use miette::Diagnostic;
use taskgraph_errors::TASKGRAPH_SITE;
use taskgraph_pipeline::PipelineError;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BuilderError {
    #[error("unknown package `{0}`")]
    #[diagnostic(code(taskgraph::engine::unknown_package))]
    UnknownPackage(String),

    #[error("no task definition found for `{0}`")]
    #[diagnostic(
        code(taskgraph::engine::missing_task_definition),
        url("{TASKGRAPH_SITE}/errors/missing-task")
    )]
    MissingTaskDefinition(String),

    #[error(
        "root task `{0}` must be declared under an explicit `//#task` key in turbo.json to be runnable as an entry"
    )]
    #[diagnostic(code(taskgraph::engine::root_task_not_enabled))]
    RootTaskNotEnabled(String),

    #[error("dependency cycle: {0}")]
    #[diagnostic(code(taskgraph::engine::cycle))]
    Cycle(String),

    #[error(
        "task `{consumer}` depends on persistent task `{dependency}`; persistent tasks cannot be depended on"
    )]
    #[diagnostic(code(taskgraph::engine::persistent_dependency_violation))]
    PersistentDependencyViolation {
        consumer: String,
        dependency: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),
}
