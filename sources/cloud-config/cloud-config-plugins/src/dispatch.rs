//! The dispatch module runs the plugins for each directive of a `ConfigDocument`.

use crate::error;
use crate::{ConfigDocument, ExecutionResult, PluginRegistry, Result};
use osutils::Executor;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::HashSet;
use std::rc::Rc;

/// What the dispatcher does when a plugin fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop at the first failure; later directives are not processed.
    Abort,
    /// Log the failure, note it in the report, and move on to the next directive.
    #[default]
    Continue,
}

/// Why a directive wasn't handed to any plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// No plugin is registered for the directive.
    Unknown,
    /// A plugin exists but isn't in the enabled list.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDirective {
    pub directive: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDirective {
    pub directive: String,
    pub error: String,
}

/// Summary of one dispatch run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DispatchReport {
    /// Combined result of every plugin that succeeded.
    pub result: ExecutionResult,
    pub applied: Vec<String>,
    pub skipped: Vec<SkippedDirective>,
    pub failed: Vec<FailedDirective>,
}

impl DispatchReport {
    pub fn reboot_required(&self) -> bool {
        self.result.reboot_required()
    }
}

/// Runs registered plugins over the directives of a document, strictly one after another in
/// document order.  Plugins change shared OS state, so a `Dispatcher` must not be run
/// concurrently against the same executor.
pub struct Dispatcher {
    registry: PluginRegistry,
    executor: Rc<dyn Executor>,
    policy: ErrorPolicy,
    enabled: Option<HashSet<String>>,
}

impl Dispatcher {
    pub fn new(registry: PluginRegistry, executor: Rc<dyn Executor>, policy: ErrorPolicy) -> Self {
        Self {
            registry,
            executor,
            policy,
            enabled: None,
        }
    }

    /// Only run plugins for the named directives; others are skipped as disabled.
    pub fn with_enabled_plugins<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Processes every directive in `document`.
    ///
    /// Unknown directives are never an error.  Plugin failures are logged; with
    /// `ErrorPolicy::Abort` the first one is returned, with `ErrorPolicy::Continue` they're
    /// collected in the report.
    pub fn dispatch(&self, document: &ConfigDocument) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();

        for directive in document.iter() {
            let name = directive.name;

            if let Some(enabled) = &self.enabled {
                if !enabled.contains(name) {
                    info!("Plugin for '{}' is disabled, skipping", name);
                    report.skipped.push(SkippedDirective {
                        directive: name.to_string(),
                        reason: SkipReason::Disabled,
                    });
                    continue;
                }
            }

            let plugin = match self.registry.get(name) {
                Some(plugin) => plugin,
                None => {
                    debug!("No plugin handles '{}', skipping", name);
                    report.skipped.push(SkippedDirective {
                        directive: name.to_string(),
                        reason: SkipReason::Unknown,
                    });
                    continue;
                }
            };

            debug!("Processing '{}'", name);
            match plugin.process(directive.value, self.executor.as_ref()) {
                Ok(result) => {
                    if result.reboot_required() {
                        info!("'{}' requires a reboot", name);
                    }
                    report.result = report.result.combine(result);
                    report.applied.push(name.to_string());
                }
                Err(e) => {
                    error!("Processing '{}' failed: {}", name, e);
                    match self.policy {
                        ErrorPolicy::Abort => {
                            return Err(e).context(error::DirectiveFailedSnafu { directive: name })
                        }
                        ErrorPolicy::Continue => report.failed.push(FailedDirective {
                            directive: name.to_string(),
                            error: e.to_string(),
                        }),
                    }
                }
            }
        }

        Ok(report)
    }
}
