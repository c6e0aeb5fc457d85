//! A small glob-like matcher for selector name patterns and the env
//! wildcard grammar (§6): a subset of glob syntax sufficient for string
//! matching, not path matching. Ported from the teacher's own
//! `simple_glob.rs`, extended with `\*`/`\!` escaping per the wildcard
//! grammar.

use regex::Regex;

pub enum SimpleGlob {
    Regex(Regex),
    String(String),
    Any,
}

pub trait Match {
    fn is_match(&self, s: &str) -> bool;
}

impl SimpleGlob {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        if pattern == "*" {
            return Ok(SimpleGlob::Any);
        }
        if !pattern.contains('*') {
            return Ok(SimpleGlob::String(pattern.to_string()));
        }

        let mut regex_str = String::from("^");
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'*') => {
                    chars.next();
                    regex_str.push_str(&regex::escape("*"));
                }
                '*' => regex_str.push_str(".*"),
                other => regex_str.push_str(&regex::escape(&other.to_string())),
            }
        }
        regex_str.push('$');
        Ok(SimpleGlob::Regex(Regex::new(&regex_str)?))
    }
}

impl Match for SimpleGlob {
    fn is_match(&self, s: &str) -> bool {
        match self {
            SimpleGlob::Regex(regex) => regex.is_match(s),
            SimpleGlob::String(string) => string == s,
            SimpleGlob::Any => true,
        }
    }
}

pub struct AnyGlob<T: Match>(pub Vec<T>);

impl<T: Match> Match for AnyGlob<T> {
    fn is_match(&self, s: &str) -> bool {
        self.0.iter().any(|glob| glob.is_match(s))
    }
}

pub struct IncludeExcludeGlob<I: Match, E: Match> {
    include: I,
    exclude: E,
}

impl<I: Match, E: Match> IncludeExcludeGlob<I, E> {
    pub fn new(include: I, exclude: E) -> Self {
        Self { include, exclude }
    }
}

impl<I: Match, E: Match> Match for IncludeExcludeGlob<I, E> {
    fn is_match(&self, s: &str) -> bool {
        self.include.is_match(s) && !self.exclude.is_match(s)
    }
}

/// Compiles the env-name wildcard grammar (§6) into an include/exclude
/// matcher: `*` matches any sequence, a leading `!` makes a pattern an
/// exclusion, and both can be escaped with a backslash to match the
/// literal character.
pub fn compile_wildcards(
    patterns: &[String],
) -> Result<IncludeExcludeGlob<AnyGlob<SimpleGlob>, AnyGlob<SimpleGlob>>, regex::Error> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for raw in patterns {
        let (negated, pattern) = if let Some(rest) = raw.strip_prefix("\\!") {
            (false, format!("!{rest}"))
        } else if let Some(rest) = raw.strip_prefix('!') {
            (true, rest.to_string())
        } else {
            (false, raw.clone())
        };
        let glob = SimpleGlob::new(&pattern)?;
        if negated {
            exclude.push(glob);
        } else {
            include.push(glob);
        }
    }
    Ok(IncludeExcludeGlob::new(AnyGlob(include), AnyGlob(exclude)))
}
