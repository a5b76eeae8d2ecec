//! # Config
//!
//! User-facing settings. Every field has a default, so partial or outdated settings files still
//! load.

use crate::tools::{ToolKind, ToolSettings};

#[derive(Clone, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tool selected on startup.
    pub default_tool: Option<ToolKind>,
    pub tools: ToolSettings,
    pub execution: ExecutionConfig,
    pub messages: Messages,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// How often the progress UI is polled for cancellation while a function runs in the
    /// background.
    pub progress_poll_ms: u64,
    /// Turn panics inside actions into non-fatal errors. Off in debug builds, so they surface with
    /// a backtrace.
    pub catch_panics: bool,
    /// Maximum number of undo steps kept. Unlimited if absent.
    pub history_limit: Option<usize>,
}
impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            progress_poll_ms: 50,
            catch_panics: !cfg!(debug_assertions),
            history_limit: Some(100),
        }
    }
}
impl ExecutionConfig {
    #[must_use]
    pub fn progress_poll(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.progress_poll_ms.max(1))
    }
}

/// Localized text shown to the user when an action fails.
/// `{name}` is replaced with the name of the action.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Messages {
    pub generic_error: String,
    pub out_of_memory: String,
}
impl Default for Messages {
    fn default() -> Self {
        Self {
            generic_error: "An error occurred while running {name}.".to_owned(),
            out_of_memory: "There is not enough memory to complete {name}.".to_owned(),
        }
    }
}
impl Messages {
    #[must_use]
    pub fn generic_error(&self, name: &str) -> String {
        self.generic_error.replace("{name}", name)
    }
    #[must_use]
    pub fn out_of_memory(&self, name: &str) -> String {
        self.out_of_memory.replace("{name}", name)
    }
}
