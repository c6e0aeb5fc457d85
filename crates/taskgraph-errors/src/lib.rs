//! Diagnostic utilities to preserve source for more actionable error
//! messages. Used in conjunction with `miette` to include source snippets in
//! errors. Any parsing of config files should attempt to produce a
//! `Spanned<T>` so that, if we need to reference where a value came from,
//! the span is available.

use std::{
    fmt,
    iter::Once,
    ops::{Deref, DerefMut, Range},
    sync::Arc,
};

use miette::{NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};

/// Base URL used to build documentation links in error messages.
pub const TASKGRAPH_SITE: &str = "https://docs.rs/taskgraph-engine";

/// A value annotated with the source span it was parsed from, if any.
///
/// `range`/`path`/`text` are populated by whoever deserialises the value
/// out of a config file; a value built purely in memory (no file behind
/// it) carries `None` for all three and renders diagnostics without a
/// source snippet.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spanned<T> {
    pub value: T,
    #[serde(skip)]
    pub range: Option<Range<usize>>,
    #[serde(skip)]
    pub path: Option<Arc<str>>,
    #[serde(skip)]
    pub text: Option<Arc<str>>,
}

impl<T> Spanned<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            range: None,
            path: None,
            text: None,
        }
    }

    pub fn with_range(self, range: impl Into<Range<usize>>) -> Self {
        Self {
            range: Some(range.into()),
            ..self
        }
    }

    pub fn with_path(self, path: impl Into<Arc<str>>) -> Self {
        Self {
            path: Some(path.into()),
            ..self
        }
    }

    pub fn with_text(self, text: impl Into<Arc<str>>) -> Self {
        Self {
            text: Some(text.into()),
            ..self
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn as_inner(&self) -> &T {
        &self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            value: f(self.value),
            range: self.range,
            path: self.path,
            text: self.text,
        }
    }

    pub fn to<U>(&self, value: U) -> Spanned<U> {
        Spanned {
            value,
            range: self.range.clone(),
            path: self.path.clone(),
            text: self.text.clone(),
        }
    }

    /// Returns the miette span/source pair for this value, defaulting to an
    /// empty named source when no provenance was recorded (miette requires
    /// a concrete `NamedSource`, not an `Option`).
    pub fn span_and_text(&self, default_path: &str) -> (Option<SourceSpan>, NamedSource) {
        let path = self.path.as_deref().unwrap_or(default_path);
        match self.range.clone().zip(self.text.as_ref()) {
            Some((range, text)) => (Some(range.into()), NamedSource::new(path, text.to_string())),
            None => (None, NamedSource::new(path, String::new())),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> DerefMut for Spanned<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T> From<T> for Spanned<T> {
    fn from(value: T) -> Self {
        Spanned::new(value)
    }
}

impl<T> IntoIterator for Spanned<T> {
    type Item = T;
    type IntoIter = Once<T>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self.value)
    }
}

/// Propagates span/path provenance onto a value once its enclosing text is
/// known, e.g. after a whole config file has been read off disk.
pub trait WithMetadata {
    fn add_text(&mut self, text: Arc<str>);
    fn add_path(&mut self, path: Arc<str>);
}

impl<T> WithMetadata for Spanned<T> {
    fn add_text(&mut self, text: Arc<str>) {
        self.text = Some(text);
    }

    fn add_path(&mut self, path: Arc<str>) {
        self.path = Some(path);
    }
}

impl<T: WithMetadata> WithMetadata for Option<T> {
    fn add_text(&mut self, text: Arc<str>) {
        if let Some(inner) = self {
            inner.add_text(text);
        }
    }

    fn add_path(&mut self, path: Arc<str>) {
        if let Some(inner) = self {
            inner.add_path(path);
        }
    }
}

impl<T: WithMetadata> WithMetadata for Vec<T> {
    fn add_text(&mut self, text: Arc<str>) {
        for item in self {
            item.add_text(text.clone());
        }
    }

    fn add_path(&mut self, path: Arc<str>) {
        for item in self {
            item.add_path(path.clone());
        }
    }
}
