//! The registry module maps directive names to the plugins that handle them.

use crate::{CloudConfigPlugin, NtpPlugin, NTP_DIRECTIVE};
use std::collections::HashMap;

/// Directive name to plugin.  Built once at start-up and only read afterward.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Box<dyn CloudConfigPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every plugin this crate provides.
    pub fn with_default_plugins() -> Self {
        let mut registry = Self::new();
        registry.register(NTP_DIRECTIVE, NtpPlugin);
        registry
    }

    /// Registers `plugin` for the directive `name`, returning the plugin it replaced, if any.
    pub fn register<S, P>(&mut self, name: S, plugin: P) -> Option<Box<dyn CloudConfigPlugin>>
    where
        S: Into<String>,
        P: CloudConfigPlugin + 'static,
    {
        self.plugins.insert(name.into(), Box::new(plugin))
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<&dyn CloudConfigPlugin> {
        self.plugins.get(name).map(|plugin| plugin.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered directive names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
