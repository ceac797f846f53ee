//! The config module owns the agent configuration file and its defaults.

use cloud_config_plugins::ErrorPolicy;
use osutils::{ExecutorConfig, Platform};
use serde::Deserialize;
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_CONFIG_PATH: &str = "/etc/cloud-config/config.toml";
const DEFAULT_USER_DATA: &str = "/var/lib/cloud/user-data";
// We only want to apply user data once per instance.  The marker is created after a successful
// run, and its presence makes later runs exit early.
const DEFAULT_MARKER_FILE: &str = "/var/lib/cloud/cloud-config.ran";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub(crate) struct AgentConfig {
    pub(crate) user_data: PathBuf,
    pub(crate) marker_file: PathBuf,
    pub(crate) error_policy: ErrorPolicy,
    /// Directives allowed to run; all registered plugins run when unset.
    pub(crate) enabled_plugins: Option<Vec<String>>,
    /// Overrides the detected platform.
    pub(crate) platform: Option<String>,
    pub(crate) executor: ExecutorConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            user_data: PathBuf::from(DEFAULT_USER_DATA),
            marker_file: PathBuf::from(DEFAULT_MARKER_FILE),
            error_policy: ErrorPolicy::default(),
            enabled_plugins: None,
            platform: None,
            executor: ExecutorConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Deserializes an AgentConfig from a given path
    pub(crate) fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).context(error::FileSnafu { path })?;
        toml::from_str(&config_str).context(error::InvalidTomlSnafu { path })
    }

    /// Deserializes an AgentConfig from a given path if it exists, otherwise uses the defaults
    pub(crate) fn from_path_or_default<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if path.exists() {
            info!("Using configuration from {}", path.display());
            Self::from_path(path)
        } else {
            debug!("{} does not exist, using default configuration", path.display());
            Ok(Self::default())
        }
    }

    pub(crate) fn platform(&self) -> Platform {
        match &self.platform {
            Some(name) => Platform::from(name.as_str()),
            None => Platform::detect(),
        }
    }
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Failed to read '{}': {}", path.display(), source))]
        File { path: PathBuf, source: io::Error },

        #[snafu(display("Invalid config file at '{}': {}", path.display(), source))]
        InvalidToml {
            path: PathBuf,
            source: toml::de::Error,
        },
    }
}

pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;
