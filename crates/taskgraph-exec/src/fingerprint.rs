//! The Fingerprinter (C5): folds the ordered set of per-task inputs named
//! in spec §4.5 into one stable hash, and memoises the result per
//! [`TaskId`] for the lifetime of one Engine run.

use std::{collections::HashMap, sync::Mutex};

use taskgraph_hash::CanonicalInput;
use taskgraph_task_id::TaskId;

/// The ordered inputs folded into one task's fingerprint (spec §4.5).
/// Assembling each field — globbing `inputs`, resolving wildcard env
/// names, computing the package content hash and the global hash — is the
/// caller's responsibility; this type only fixes the canonical order and
/// hashes the result.
pub struct FingerprintInputs<'a> {
    pub package_content_hash: &'a str,
    /// Package-content hashes of the package's internal workspace-graph
    /// ancestors, already sorted by package name (spec §4.5 step 2).
    pub internal_ancestor_hashes: &'a [String],
    pub external_dependency_fingerprint: &'a str,
    pub task_name: &'a str,
    /// Preserves declaration order (spec §4.5 step 5 — unlike
    /// `TaskDefinition::outputs`, which is sorted at parse time, this list
    /// is hashed as the merged definition left it).
    pub outputs: &'a [String],
    /// Resolved environment-variable values, already sorted by name (spec
    /// §4.5 step 6).
    pub resolved_env: &'a [(String, String)],
    pub global_hash: &'a str,
    pub pass_through_args: &'a [String],
}

/// Computes the spec §4.5 per-task fingerprint: a fixed 64-bit content
/// hash over the canonical, length-prefixed serialisation of
/// [`FingerprintInputs`] in its documented order.
pub fn fingerprint(inputs: &FingerprintInputs<'_>) -> String {
    CanonicalInput::new()
        .field(inputs.package_content_hash)
        .fields(inputs.internal_ancestor_hashes)
        .field(inputs.external_dependency_fingerprint)
        .field(inputs.task_name)
        .fields(inputs.outputs)
        .fields(inputs.resolved_env.iter().map(|(k, v)| format!("{k}={v}")))
        .field(inputs.global_hash)
        .fields(inputs.pass_through_args)
        .finish_hex()
}

/// Memoises the fingerprint computed for each [`TaskId`] during one Engine
/// run, so repeated lookups — e.g. from both the scheduler and a summary
/// reporter — never recompute a hash (spec §4.5). `Send + Sync` because
/// multiple scheduler workers may query and populate it concurrently
/// (spec §5).
#[derive(Default)]
pub struct TaskHashTracker {
    hashes: Mutex<HashMap<TaskId<'static>, String>>,
}

impl TaskHashTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoised fingerprint for `task_id`, computing and
    /// caching it via `compute` on the first lookup this run.
    pub fn get_or_compute(&self, task_id: &TaskId<'static>, compute: impl FnOnce() -> String) -> String {
        let mut hashes = self.hashes.lock().expect("task hash tracker mutex poisoned");
        hashes.entry(task_id.clone()).or_insert_with(compute).clone()
    }

    pub fn get(&self, task_id: &TaskId<'static>) -> Option<String> {
        self.hashes
            .lock()
            .expect("task hash tracker mutex poisoned")
            .get(task_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use taskgraph_task_id::PackageName;

    use super::*;

    fn base_inputs() -> FingerprintInputs<'static> {
        FingerprintInputs {
            package_content_hash: "pkg-hash",
            internal_ancestor_hashes: &[],
            external_dependency_fingerprint: "ext-hash",
            task_name: "build",
            outputs: &[],
            resolved_env: &[],
            global_hash: "global-hash",
            pass_through_args: &[],
        }
    }

    #[test]
    fn identical_inputs_fingerprint_identically() {
        assert_eq!(fingerprint(&base_inputs()), fingerprint(&base_inputs()));
    }

    #[test]
    fn changing_the_package_content_hash_changes_the_fingerprint() {
        let mut flipped = base_inputs();
        flipped.package_content_hash = "pkg-hash-flipped";
        assert_ne!(fingerprint(&base_inputs()), fingerprint(&flipped));
    }

    #[test]
    fn changing_an_unrelated_field_does_not_touch_other_fingerprints() {
        // Flipping the task name (simulating an unrelated sibling task)
        // must not somehow collide with the base fingerprint.
        let mut other_task = base_inputs();
        other_task.task_name = "test";
        assert_ne!(fingerprint(&base_inputs()), fingerprint(&other_task));
    }

    #[test]
    fn tracker_computes_each_task_at_most_once() {
        let tracker = TaskHashTracker::new();
        let calls = AtomicUsize::new(0);
        let id = TaskId::new(PackageName::from("libA"), "build");

        let first = tracker.get_or_compute(&id, || {
            calls.fetch_add(1, Ordering::SeqCst);
            "hash-1".to_string()
        });
        let second = tracker.get_or_compute(&id, || {
            calls.fetch_add(1, Ordering::SeqCst);
            "hash-2".to_string()
        });

        assert_eq!(first, "hash-1");
        assert_eq!(second, "hash-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
