//! The on-the-wire `turbo.json` schema (§6), deserialised field-for-field
//! with `serde_json` before being converted into the validated
//! [`crate::TaskDefinition`] family the resolver operates on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    Full,
    HashOnly,
    NewOnly,
    None,
    ErrorsOnly,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Full
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTaskDefinition {
    #[serde(default)]
    pub depends_on: Option<Vec<String>>,
    #[serde(default)]
    pub outputs: Option<Vec<String>>,
    #[serde(default)]
    pub cache: Option<bool>,
    #[serde(default)]
    pub persistent: Option<bool>,
    #[serde(default)]
    pub interruptible: Option<bool>,
    #[serde(default)]
    pub interactive: Option<bool>,
    #[serde(default)]
    pub inputs: Option<Vec<String>>,
    #[serde(default)]
    pub env: Option<Vec<String>>,
    #[serde(default)]
    pub pass_through_env: Option<Vec<String>>,
    #[serde(default)]
    pub dot_env: Option<Vec<String>>,
    #[serde(default)]
    pub output_mode: Option<OutputMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTurboJson {
    #[serde(default)]
    pub global_dependencies: Vec<String>,
    #[serde(default)]
    pub global_env: Vec<String>,
    #[serde(default)]
    pub global_pass_through_env: Option<Vec<String>>,
    #[serde(default)]
    pub pipeline: HashMap<String, RawTaskDefinition>,
    /// Only meaningful (and required) in workspace-local configs; a root
    /// config's `extends` is ignored if present.
    #[serde(default)]
    pub extends: Option<Vec<String>>,
}

impl RawTurboJson {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
