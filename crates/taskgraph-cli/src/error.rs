//! The single place component errors are aggregated into one `Result` the
//! binary can report (spec's Ambient Stack §Error handling & diagnostics —
//! library crates never `Box<dyn Error>` internally, but the binary
//! boundary is exactly where that aggregation belongs).

use miette::Diagnostic;
use thiserror::Error;

use crate::manifest::ManifestError;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Scope(#[from] taskgraph_scope::ScopeError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Builder(#[from] taskgraph_engine::BuilderError),
    #[error("selector `{1}` is malformed: {0}")]
    Selector(taskgraph_scope::SelectorError, String),
    #[error("{count} task(s) failed")]
    TasksFailed { count: usize },
}
