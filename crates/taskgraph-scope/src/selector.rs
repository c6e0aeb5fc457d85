//! The selector grammar (§4.3): a small hand-written parser, not a
//! whole-string regex, per the design note in spec §9.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("selector `{0}` has an unterminated `{{` parent-directory group")]
    UnterminatedBrace(String),
    #[error("selector `{0}` has an unterminated `[` change-range group")]
    UnterminatedBracket(String),
    #[error("selector `{0}` is empty")]
    Empty(String),
}

/// A parsed `--filter`/`--scope` selector.
///
/// Grammar: `[!][...]<name-glob|{parentDir}>[[fromRef[...toRef]]][...][@version]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetSelector {
    pub exclude: bool,
    pub include_dependents: bool,
    pub include_dependencies: bool,
    pub name_pattern: Option<String>,
    pub parent_dir: Option<String>,
    pub from_ref: Option<String>,
    pub to_ref: Option<String>,
}

impl TargetSelector {
    pub fn is_selector_by_location(&self) -> bool {
        self.parent_dir.is_some()
    }

    pub fn is_selector_by_change(&self) -> bool {
        self.from_ref.is_some() || self.to_ref.is_some()
    }
}

impl FromStr for TargetSelector {
    type Err = SelectorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(SelectorError::Empty(input.to_owned()));
        }

        let mut s = input;
        let exclude = strip_prefix(&mut s, "!");
        let include_dependents = strip_prefix(&mut s, "...");

        let mut parent_dir = None;
        if let Some(rest) = s.strip_prefix('{') {
            let end = rest
                .find('}')
                .ok_or_else(|| SelectorError::UnterminatedBrace(input.to_owned()))?;
            parent_dir = Some(rest[..end].to_string());
            s = &rest[end + 1..];
        }

        let mut from_ref = None;
        let mut to_ref = None;
        if let Some(rest) = s.strip_prefix('[') {
            let end = rest
                .find(']')
                .ok_or_else(|| SelectorError::UnterminatedBracket(input.to_owned()))?;
            let range = &rest[..end];
            match range.split_once("...") {
                Some((from, to)) => {
                    from_ref = non_empty(from);
                    to_ref = non_empty(to);
                }
                None => from_ref = non_empty(range),
            }
            s = &rest[end + 1..];
        }

        let include_dependencies = strip_suffix(&mut s, "...");

        // Strip a trailing `@version` qualifier; versions are not part of
        // this engine's package identity and are accepted only for source
        // compatibility with selector strings that name one.
        let s = match s.rfind('@') {
            Some(idx) if idx > 0 => &s[..idx],
            _ => s,
        };

        Ok(TargetSelector {
            exclude,
            include_dependents,
            include_dependencies,
            name_pattern: non_empty(s),
            parent_dir,
            from_ref,
            to_ref,
        })
    }
}

fn strip_prefix(s: &mut &str, prefix: &str) -> bool {
    if let Some(rest) = s.strip_prefix(prefix) {
        *s = rest;
        true
    } else {
        false
    }
}

fn strip_suffix(s: &mut &str, suffix: &str) -> bool {
    if let Some(rest) = s.strip_suffix(suffix) {
        *s = rest;
        true
    } else {
        false
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("libA", TargetSelector { name_pattern: Some("libA".into()), ..Default::default() } ; "bare name")]
    #[test_case("...libA", TargetSelector { include_dependents: true, name_pattern: Some("libA".into()), ..Default::default() } ; "dependents prefix")]
    #[test_case("libA...", TargetSelector { include_dependencies: true, name_pattern: Some("libA".into()), ..Default::default() } ; "dependencies suffix")]
    #[test_case("...libA...", TargetSelector { include_dependents: true, include_dependencies: true, name_pattern: Some("libA".into()), ..Default::default() } ; "both directions")]
    #[test_case("!libA", TargetSelector { exclude: true, name_pattern: Some("libA".into()), ..Default::default() } ; "exclusion")]
    #[test_case("{packages/libA}", TargetSelector { parent_dir: Some("packages/libA".into()), ..Default::default() } ; "parent dir")]
    #[test_case("[main]", TargetSelector { from_ref: Some("main".into()), ..Default::default() } ; "single ref range")]
    #[test_case("[main...HEAD]", TargetSelector { from_ref: Some("main".into()), to_ref: Some("HEAD".into()), ..Default::default() } ; "full ref range")]
    #[test_case("libA@1.0.0", TargetSelector { name_pattern: Some("libA".into()), ..Default::default() } ; "version suffix stripped")]
    fn parses_selector(input: &str, expected: TargetSelector) {
        assert_eq!(TargetSelector::from_str(input).unwrap(), expected);
    }

    #[test]
    fn rejects_unterminated_groups() {
        assert!(TargetSelector::from_str("{unterminated").is_err());
        assert!(TargetSelector::from_str("[unterminated").is_err());
    }

    #[test]
    fn empty_selector_is_an_error() {
        assert_eq!(
            TargetSelector::from_str(""),
            Err(SelectorError::Empty(String::new()))
        );
    }
}
