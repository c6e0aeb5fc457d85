//! Execution: the Fingerprinter (C5), the Scheduler/Walker (C6), and the
//! Collaborator Interfaces (C7) the core consumes to actually run tasks.

mod collaborators;
mod fingerprint;
mod scheduler;
mod walker;

pub use collaborators::{Artifact, Cache, CacheState, FileHasher, NoopUi, Scm, Ui, Visitor, VisitorError};
pub use fingerprint::{fingerprint, FingerprintInputs, TaskHashTracker};
pub use scheduler::{run, SchedulerOptions, SchedulerReport};
pub use walker::{Start, Walking, Walker};
