//! The Collaborator Interfaces (C7): the capability boundary between the
//! core orchestration logic and everything platform- or product-specific —
//! file hashing, source control, the cache, visible execution, and
//! progress UI. The core only ever depends on these traits.

use camino::{Utf8Path, Utf8PathBuf};
use taskgraph_task_id::TaskId;

/// Whether a cache lookup found a matching artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Hit,
    Miss,
}

/// An opaque bundle of cached output files; the core never inspects its
/// contents, only round-trips it between [`Cache::fetch`] and
/// [`Cache::put`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    pub files: Vec<(Utf8PathBuf, Vec<u8>)>,
}

/// Computes a package's content hash, optionally narrowed to files
/// matching `include` and not matching `exclude` (the task's `inputs`
/// globs). Implementations must normalise path separators to `/` before
/// hashing so the result is stable across platforms (spec §4.7).
pub trait FileHasher: Send + Sync {
    fn hash_package(
        &self,
        package_dir: &Utf8Path,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
    ) -> std::io::Result<String>;
}

/// Reports files changed between two refs for the Filter's change-based
/// selectors (spec §4.3, §4.7). Relative paths use the host path
/// separator; the Filter is responsible for normalising them.
pub trait Scm: Send + Sync {
    fn changed_files(
        &self,
        from_ref: Option<&str>,
        to_ref: Option<&str>,
        include_untracked: bool,
        relative_to: &Utf8Path,
    ) -> std::io::Result<Vec<Utf8PathBuf>>;
}

/// The remote/local cache. Implementation-specific; the core treats it as
/// opaque (spec §4.7).
pub trait Cache: Send + Sync {
    fn fetch(&self, package_dir: &Utf8Path, hash: &str) -> Option<Artifact>;
    fn put(&self, package_dir: &Utf8Path, hash: &str, artifact: &Artifact) -> std::io::Result<()>;
    fn exists(&self, hash: &str) -> CacheState;
}

pub type VisitorError = Box<dyn std::error::Error + Send + Sync>;

/// Executes one task. The scheduler may call `visit` from multiple threads
/// concurrently, so implementations must be safe under that assumption; it
/// may block (spec §4.6).
pub trait Visitor: Send + Sync {
    fn visit(&self, task_id: &TaskId<'static>) -> Result<(), VisitorError>;
}

/// A sink for progress messages; the core must function with a no-op UI
/// (spec §4.7).
pub trait Ui: Send + Sync {
    fn task_started(&self, _task_id: &TaskId<'static>) {}
    fn task_finished(&self, _task_id: &TaskId<'static>, _succeeded: bool) {}
}

#[derive(Debug, Default)]
pub struct NoopUi;

impl Ui for NoopUi {}
