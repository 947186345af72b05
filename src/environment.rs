//! Environment lookup module
//!
//! Reads the notebook description the extension exposes. Values come from an
//! injectable key-value source so the lookup can run against the process
//! environment in production and an in-memory map in tests.

use serde::Serialize;
use std::collections::HashMap;

/// Variable holding the notebook flavour shown in the UI
pub const NOTEBOOK_TYPE_VAR: &str = "NOTEABLE_NOTEBOOK_TYPE";
/// Variable holding the icon URL for that flavour
pub const NOTEBOOK_ICON_VAR: &str = "NOTEABLE_NOTEBOOK_ICON";

pub const DEFAULT_NOTEBOOK_TYPE: &str = "Default Notebook";
pub const DEFAULT_NOTEBOOK_ICON: &str = "https://noteable.edina.ac.uk/images/programmers.svg";

/// Source of environment-style key/value pairs
pub trait EnvSource: Send + Sync {
    /// Returns `None` when the key is not set.
    fn var(&self, key: &str) -> Option<String>;

    /// Returns the value for `key`, or `default` when it is unset or empty.
    fn var_or(&self, key: &str, default: &str) -> String {
        self.var(key)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}

/// The live process environment, read on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        // Non-unicode values are treated as unset
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Notebook description returned by the `env` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    pub notebook_type: String,
    pub icon_type_url: String,
}

impl EnvironmentInfo {
    pub fn lookup(source: &dyn EnvSource) -> Self {
        Self {
            notebook_type: source.var_or(NOTEBOOK_TYPE_VAR, DEFAULT_NOTEBOOK_TYPE),
            icon_type_url: source.var_or(NOTEBOOK_ICON_VAR, DEFAULT_NOTEBOOK_ICON),
        }
    }
}
