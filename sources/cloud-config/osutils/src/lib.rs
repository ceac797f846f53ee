/*!
# Introduction

osutils is the OS-facing half of cloud-config.  It owns the `Executor` trait, which exposes the
privileged system changes that cloud-config plugins may request, and the backends implementing it
for each supported platform:

* Linux: `ChronyExecutor` writes the chrony configuration and restarts the time service.
* Windows: `W32TimeExecutor` reconfigures the Windows Time service through `w32tm`.

`OsCapabilityProvider` picks the backend for the detected (or configured) platform.  It is meant to
be built once at start-up, and the executor it returns handed to whatever needs it.
*/

#[macro_use]
extern crate log;

mod chrony;
mod command;
mod w32time;

pub use chrony::ChronyExecutor;
pub use w32time::W32TimeExecutor;

use serde::Deserialize;
use std::cell::OnceCell;
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

const DEFAULT_CHRONY_CONF: &str = "/etc/chrony.conf";
const DEFAULT_SYSTEMCTL: &str = "/usr/bin/systemctl";
const DEFAULT_TIME_SERVICE: &str = "chronyd";
const DEFAULT_W32TM: &str = r"C:\Windows\System32\w32tm.exe";

/// The capabilities a platform backend offers to cloud-config plugins.
///
/// Every method mutates live OS state.  Calls are not transactional and are not retried here; a
/// failure is reported to the caller as-is.
pub trait Executor {
    /// Point network time synchronization at the given hosts, in order of preference.
    fn set_ntp_servers(&self, servers: &[String]) -> Result<()>;
}

/// The operating system family we're running on, as far as backend selection is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    Other(String),
}

impl Platform {
    /// The platform this binary was built for.
    pub fn detect() -> Self {
        Self::from(std::env::consts::OS)
    }
}

impl From<&str> for Platform {
    fn from(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "linux" => Platform::Linux,
            "windows" => Platform::Windows,
            _ => Platform::Other(name.to_string()),
        }
    }
}

impl FromStr for Platform {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::Windows => write!(f, "windows"),
            Platform::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Paths and knobs used by the platform backends.  Every field has a default so a configuration
/// file only needs to mention what differs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct ExecutorConfig {
    pub chrony_conf: PathBuf,
    pub systemctl: PathBuf,
    pub time_service: String,
    pub restart_time_service: bool,
    pub w32tm: PathBuf,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            chrony_conf: PathBuf::from(DEFAULT_CHRONY_CONF),
            systemctl: PathBuf::from(DEFAULT_SYSTEMCTL),
            time_service: DEFAULT_TIME_SERVICE.to_string(),
            restart_time_service: true,
            w32tm: PathBuf::from(DEFAULT_W32TM),
        }
    }
}

/// Selects the `Executor` implementation for a platform and hands out the same instance on every
/// later request.
pub struct OsCapabilityProvider {
    platform: Platform,
    config: ExecutorConfig,
    executor: OnceCell<Rc<dyn Executor>>,
}

impl OsCapabilityProvider {
    pub fn new(platform: Platform, config: ExecutorConfig) -> Self {
        Self {
            platform,
            config,
            executor: OnceCell::new(),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Returns the executor for our platform, building it on first use.
    pub fn executor(&self) -> Result<Rc<dyn Executor>> {
        if let Some(executor) = self.executor.get() {
            return Ok(Rc::clone(executor));
        }

        let executor: Rc<dyn Executor> = match &self.platform {
            Platform::Linux => Rc::new(ChronyExecutor::new(&self.config)),
            Platform::Windows => Rc::new(W32TimeExecutor::new(&self.config)),
            Platform::Other(name) => {
                return error::UnsupportedPlatformSnafu { platform: name }.fail()
            }
        };
        debug!("Using {} executor", self.platform);

        // Single-threaded; nothing can have filled the cell since the check above.
        let _ = self.executor.set(Rc::clone(&executor));
        Ok(executor)
    }
}

/// Stand-in executor for platforms without a backend.  Every capability fails with
/// `UnsupportedPlatform`, which lets a caller keep going and only fail the directives that actually
/// need the OS.
#[derive(Debug)]
pub struct UnsupportedExecutor {
    platform: Platform,
}

impl UnsupportedExecutor {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

impl Executor for UnsupportedExecutor {
    fn set_ntp_servers(&self, _servers: &[String]) -> Result<()> {
        error::UnsupportedPlatformSnafu {
            platform: self.platform.to_string(),
        }
        .fail()
    }
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(crate)))]
    pub enum Error {
        #[snafu(display("Platform '{}' has no OS executor", platform))]
        UnsupportedPlatform { platform: String },

        #[snafu(display("Refusing to configure an empty list of NTP servers"))]
        NoServers,

        #[snafu(display("Unable to create temporary file in '{}': {}", path.display(), source))]
        CreateTempfile { path: PathBuf, source: io::Error },

        #[snafu(display("Unable to write '{}': {}", path.display(), source))]
        WriteConfig { path: PathBuf, source: io::Error },

        #[snafu(display("Unable to replace '{}': {}", path.display(), source))]
        PersistConfig {
            path: PathBuf,
            source: tempfile::PersistError,
        },

        #[snafu(display("Failed to execute '{}': {}", command, source))]
        ExecutionFailure { command: String, source: io::Error },

        #[snafu(display("'{}' failed with {} - stderr: {}", command, status, stderr))]
        CommandFailure {
            command: String,
            status: std::process::ExitStatus,
            stdout: String,
            stderr: String,
        },
    }
}

pub use error::Error;
pub type Result<T> = std::result::Result<T, error::Error>;
