//! The Pipeline Resolver (C2): loads per-workspace task definitions and
//! merges root + workspace-local definitions via single-level
//! inheritance.

mod definition;
mod error;
mod loader;
mod raw;
mod resolver;

pub use definition::{BookkeepingTaskDefinition, TaskDefinition};
pub use error::PipelineError;
pub use loader::{FsTurboJsonLoader, MemoryTurboJsonLoader, TurboJsonLoader};
pub use raw::{OutputMode, RawTaskDefinition, RawTurboJson};
pub use resolver::PipelineResolver;
