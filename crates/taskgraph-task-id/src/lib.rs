//! Canonical identifiers for packages and tasks.
//!
//! A [`TaskId`] always names a concrete `(package, task)` pair and is the
//! only way a task is addressed once it has entered a [`TaskGraph`]; the
//! synthetic graph root is a distinct, unrepresentable-in-user-input value
//! (`TaskNode::Root` in `taskgraph-graph-utils`) and is never spelled as a
//! `TaskId`. A [`TaskName`] is the looser, possibly-unqualified form found
//! as a pipeline key or in a `dependsOn` entry, before it has been resolved
//! against a specific package.

use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The reserved name of the repository root package. Distinct from the
/// synthetic task-graph root sentinel, which this crate never represents.
pub const ROOT_PKG_NAME: &str = "//";

const TASK_DELIMITER: char = '#';
const TOPOLOGICAL_PREFIX: char = '^';

/// Tokens that may never appear literally in a task name because they are
/// used as delimiters elsewhere in the wire format.
const INVALID_TOKENS: &[&str] = &["$colon$"];

/// Identifies a package: either the repo root, or a named workspace member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PackageName {
    Root,
    Other(String),
}

impl PackageName {
    pub fn as_str(&self) -> &str {
        match self {
            PackageName::Root => ROOT_PKG_NAME,
            PackageName::Other(name) => name.as_str(),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, PackageName::Root)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PackageName {
    fn from(value: &str) -> Self {
        if value == ROOT_PKG_NAME {
            PackageName::Root
        } else {
            PackageName::Other(value.to_owned())
        }
    }
}

impl From<String> for PackageName {
    fn from(value: String) -> Self {
        if value == ROOT_PKG_NAME {
            PackageName::Root
        } else {
            PackageName::Other(value)
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskIdError {
    #[error("invalid task id `{0}`: expected exactly one `{TASK_DELIMITER}`")]
    MalformedId(String),
    #[error("invalid task name `{0}`: contains a reserved token")]
    ReservedToken(String),
}

/// Validates a bare task name (the part after `#`, or a whole unqualified
/// name) against the small set of tokens reserved for wire-format
/// delimiters.
pub fn validate_task_name(name: &str) -> Result<(), TaskIdError> {
    if INVALID_TOKENS.iter().any(|token| name.contains(token)) {
        return Err(TaskIdError::ReservedToken(name.to_owned()));
    }
    Ok(())
}

/// A possibly package-qualified task reference, as it appears as a pipeline
/// key or in a `dependsOn` list, before being resolved to a concrete
/// `TaskId`. Does not carry the `^` topological marker; callers strip that
/// before constructing a `TaskName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskName<'a> {
    package: Option<Cow<'a, str>>,
    task: Cow<'a, str>,
}

impl<'a> TaskName<'a> {
    pub fn new(package: Option<impl Into<Cow<'a, str>>>, task: impl Into<Cow<'a, str>>) -> Self {
        Self {
            package: package.map(Into::into),
            task: task.into(),
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn is_package_task(&self) -> bool {
        self.package.is_some()
    }

    pub fn into_owned(self) -> TaskName<'static> {
        TaskName {
            package: self.package.map(|p| Cow::Owned(p.into_owned())),
            task: Cow::Owned(self.task.into_owned()),
        }
    }

    /// Resolves this name against a concrete "current package", honouring
    /// explicit qualification if present.
    pub fn task_id_in(&self, current_package: &PackageName) -> TaskId<'static> {
        let task = self.task.clone().into_owned();
        match &self.package {
            Some(pkg) => TaskId::new(PackageName::from(pkg.as_ref()), task),
            None => TaskId::new(current_package.clone(), task),
        }
    }
}

impl<'a> fmt::Display for TaskName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(pkg) => write!(f, "{pkg}{TASK_DELIMITER}{}", self.task),
            None => f.write_str(&self.task),
        }
    }
}

impl<'a> From<&'a str> for TaskName<'a> {
    fn from(value: &'a str) -> Self {
        match value.split_once(TASK_DELIMITER) {
            Some((pkg, task)) => TaskName::new(Some(pkg), task),
            None => TaskName::new(None::<&str>, value),
        }
    }
}

/// A dependency entry as written in `dependsOn`, split into its
/// topological/qualified/bare shape ahead of graph expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyRef<'a> {
    /// `^task` — same-named task in every workspace-graph child.
    Topological(TaskName<'a>),
    /// `pkg#task` — explicit package qualification.
    Qualified(TaskName<'a>),
    /// `task` — same package.
    Bare(TaskName<'a>),
}

impl<'a> DependencyRef<'a> {
    pub fn parse(raw: &'a str) -> Self {
        if let Some(rest) = raw.strip_prefix(TOPOLOGICAL_PREFIX) {
            DependencyRef::Topological(TaskName::new(None::<&str>, rest))
        } else {
            let name = TaskName::from(raw);
            if name.is_package_task() {
                DependencyRef::Qualified(name)
            } else {
                DependencyRef::Bare(name)
            }
        }
    }
}

/// The canonical identifier of a task node: `<package>#<task>`, or
/// `//#<task>` for a root task. Always fully qualified — unlike
/// `TaskName`, a `TaskId` never omits the package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId<'a> {
    package: Cow<'a, str>,
    task: Cow<'a, str>,
}

impl<'a> TaskId<'a> {
    pub fn new(package: PackageName, task: impl Into<Cow<'a, str>>) -> Self {
        Self {
            package: Cow::Owned(package.as_str().to_owned()),
            task: task.into(),
        }
    }

    pub fn from_static(package: &'a str, task: &'a str) -> Self {
        Self {
            package: Cow::Borrowed(package),
            task: Cow::Borrowed(task),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn is_root_task(&self) -> bool {
        self.package == ROOT_PKG_NAME
    }

    pub fn as_task_name(&self) -> TaskName<'_> {
        TaskName::new(Some(self.package.as_ref()), self.task.as_ref())
    }

    pub fn into_owned(self) -> TaskId<'static> {
        TaskId {
            package: Cow::Owned(self.package.into_owned()),
            task: Cow::Owned(self.task.into_owned()),
        }
    }
}

impl<'a> fmt::Display for TaskId<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{TASK_DELIMITER}{}", self.package, self.task)
    }
}

impl FromStr for TaskId<'static> {
    type Err = TaskIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // `//#task` contains two `#`-adjacent slashes but only one real
        // delimiter; splitn(2) keeps the package-side slash-pair intact
        // while still rejecting a second stray `#` in the task part.
        let mut parts = value.splitn(2, TASK_DELIMITER);
        let package = parts.next().filter(|s| !s.is_empty());
        let task = parts.next();
        match (package, task) {
            (Some(package), Some(task)) if !task.contains(TASK_DELIMITER) => {
                validate_task_name(task).map_err(|_| TaskIdError::MalformedId(value.to_owned()))?;
                Ok(TaskId::new(PackageName::from(package), task.to_owned()))
            }
            _ => Err(TaskIdError::MalformedId(value.to_owned())),
        }
    }
}
