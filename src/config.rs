use crate::{Result, Severity};
use serde::{Deserialize, Serialize};

pub(crate) const CONTAINER_CLASS: &str = "toast-container";
/// Must match the exit transition in the page stylesheet.
pub(crate) const HIDE_DELAY_MS: u32 = 400;
pub(crate) const DURATION_MS: u32 = 5000;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Class used to find (or mark) the page's single toast container.
    pub container_class: String,
    /// Delay between removing `show` and detaching the node.
    pub hide_delay_ms: u32,
    /// Lifetime of toasts shown without an explicit duration or severity helper.
    pub duration_ms: u32,
    pub durations: Durations,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            container_class: CONTAINER_CLASS.to_string(),
            hide_delay_ms: HIDE_DELAY_MS,
            duration_ms: DURATION_MS,
            durations: Durations::default(),
        }
    }
}

impl Config {
    pub fn from_json(input: &str) -> Result<Config> {
        Ok(serde_json::from_str(input)?)
    }
}

/// Per-severity lifetimes, in milliseconds, used by the fixed-severity helpers.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Durations {
    pub success: u32,
    pub error: u32,
    pub warning: u32,
    pub info: u32,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            success: Severity::Success.default_duration_ms(),
            error: Severity::Error.default_duration_ms(),
            warning: Severity::Warning.default_duration_ms(),
            info: Severity::Info.default_duration_ms(),
        }
    }
}

impl Durations {
    pub fn get(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Success => self.success,
            Severity::Error => self.error,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }
}
