//! The plugin module owns the `CloudConfigPlugin` trait that every directive handler implements.

use crate::Result;
use osutils::Executor;
use serde::Serialize;
use serde_yaml::Value;

/// What a successfully applied directive needs from the host afterward.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionResult {
    #[default]
    NoRebootRequired,
    RebootRequired,
}

impl ExecutionResult {
    /// Merges two results; a reboot requested by either one wins.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (ExecutionResult::NoRebootRequired, ExecutionResult::NoRebootRequired) => {
                ExecutionResult::NoRebootRequired
            }
            _ => ExecutionResult::RebootRequired,
        }
    }

    pub fn reboot_required(self) -> bool {
        self == ExecutionResult::RebootRequired
    }
}

/// Support for a new directive can be added by implementing this trait and registering the
/// implementor in a `PluginRegistry` under the directive's name.
///
/// Plugins hold no state between calls.  Anything that changes the OS goes through the given
/// executor; whether the run continues after an error is the dispatcher's call, not the plugin's.
pub trait CloudConfigPlugin {
    /// Apply the directive, given its value from the user data.
    fn process(&self, data: &Value, executor: &dyn Executor) -> Result<ExecutionResult>;
}
