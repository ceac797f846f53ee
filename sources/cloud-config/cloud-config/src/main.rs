/*!
# Introduction

cloud-config applies cloud-config user data to the host at first boot.

It reads the user data file (plain or gzip-compressed), and if its first line is `#cloud-config`,
runs the plugin registered for each top-level directive, in the order the directives appear.
Directives without a plugin are skipped.  The OS changes themselves are made by the executor for
the current platform; on Linux that means rewriting chrony.conf and restarting chronyd.

A JSON summary of the run is printed to stdout, including whether a reboot was requested; logs go
to stderr.

# Configuration

Configuration is read from `/etc/cloud-config/config.toml` if it exists:

```toml
user-data = "/var/lib/cloud/user-data"
marker-file = "/var/lib/cloud/cloud-config.ran"
error-policy = "continue"    # or "abort"
enabled-plugins = ["ntp"]

[executor]
chrony-conf = "/etc/chrony.conf"
time-service = "chronyd"
```

After a successful run, the marker file is created, and later runs exit without doing anything
unless `--force` is given.
*/

#[macro_use]
extern crate log;

mod config;

use argh::FromArgs;
use cloud_config_plugins::user_data::load_document;
use cloud_config_plugins::{DispatchReport, Dispatcher, PluginRegistry};
use config::{AgentConfig, DEFAULT_CONFIG_PATH};
use env_logger::{Env, Target, WriteStyle};
use log::LevelFilter;
use osutils::{Executor, OsCapabilityProvider, UnsupportedExecutor};
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

/// The environment variable used to set log level for env_logger
const LOG_LEVEL_ENV_VAR: &str = "CLOUD_CONFIG_LOG_LEVEL";

#[derive(FromArgs, Debug)]
/// Apply cloud-config user data to this host
struct Args {
    #[argh(option, default = "PathBuf::from(DEFAULT_CONFIG_PATH)")]
    /// path to the configuration file
    config: PathBuf,

    #[argh(option)]
    /// path to the user data, overriding the configuration file
    user_data: Option<PathBuf>,

    #[argh(option)]
    /// log level (trace|debug|info|warn|error), overriding CLOUD_CONFIG_LOG_LEVEL
    log_level: Option<LevelFilter>,

    #[argh(switch)]
    /// run even if cloud-config already ran on this host
    force: bool,
}

/// Since the run report goes to stdout, all logging goes to stderr.  The level comes from the
/// command line if given, otherwise from the environment, defaulting to info.
fn setup_logging(log_level: Option<LevelFilter>) -> Result<()> {
    let env = Env::default().filter_or(LOG_LEVEL_ENV_VAR, "info");
    let mut builder = env_logger::Builder::from_env(env);
    builder
        .format_module_path(false)
        .target(Target::Stderr)
        .write_style(WriteStyle::Never);
    if let Some(log_level) = log_level {
        builder.filter_level(log_level);
    }
    builder.try_init().context(error::LoggerSnafu)
}

/// Returns the executor for our platform.  On a platform without one we still run, so directives
/// that never touch the OS can apply; the ones that do will fail with `UnsupportedPlatform`.
fn platform_executor(provider: &OsCapabilityProvider) -> Rc<dyn Executor> {
    match provider.executor() {
        Ok(executor) => executor,
        Err(e) => {
            warn!("{}", e);
            Rc::new(UnsupportedExecutor::new(provider.platform().clone()))
        }
    }
}

/// Runs every plugin for the user data at `user_data_path`, making OS changes through `executor`.
fn apply_user_data(
    config: &AgentConfig,
    executor: Rc<dyn Executor>,
    user_data_path: &Path,
) -> Result<DispatchReport> {
    let document = match load_document(user_data_path).context(error::UserDataSnafu)? {
        Some(document) => document,
        None => {
            info!("No cloud-config user data to apply");
            return Ok(DispatchReport::default());
        }
    };
    info!(
        "Found {} directive(s) in {}",
        document.len(),
        user_data_path.display()
    );

    let mut dispatcher = Dispatcher::new(
        PluginRegistry::with_default_plugins(),
        executor,
        config.error_policy,
    );
    if let Some(enabled) = &config.enabled_plugins {
        dispatcher = dispatcher.with_enabled_plugins(enabled.iter().cloned());
    }

    dispatcher.dispatch(&document).context(error::DispatchSnafu)
}

fn run() -> Result<()> {
    let args: Args = argh::from_env();
    setup_logging(args.log_level)?;

    info!("cloud-config started");
    let config = AgentConfig::from_path_or_default(&args.config).context(error::ConfigSnafu)?;

    if config.marker_file.exists() && !args.force {
        info!(
            "{} exists, cloud-config already ran on this host",
            config.marker_file.display()
        );
        return Ok(());
    }

    let user_data_path = args
        .user_data
        .as_deref()
        .unwrap_or(config.user_data.as_path());
    // The one provider for this run; everything that needs the OS shares its executor.
    let provider = OsCapabilityProvider::new(config.platform(), config.executor.clone());
    let report = apply_user_data(&config, platform_executor(&provider), user_data_path)?;

    for failed in &report.failed {
        warn!("'{}' was not applied: {}", failed.directive, failed.error);
    }
    if report.reboot_required() {
        info!("A reboot is required to finish applying user data");
    }
    let output = serde_json::to_string(&report).context(error::ReportSnafu)?;
    println!("{}", output);

    fs::write(&config.marker_file, "").unwrap_or_else(|e| {
        warn!(
            "Failed to create marker file {}, may unexpectedly run again: {}",
            config.marker_file.display(),
            e
        )
    });

    Ok(())
}

// Returning a Result from main makes it print a Debug representation of the error, but with Snafu
// we have nice Display representations of the error, so we wrap "main" (run) and print any error.
// https://github.com/shepmaster/snafu/issues/110
fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("{}", source))]
        Config { source: crate::config::Error },

        #[snafu(display("{}", source))]
        UserData {
            source: cloud_config_plugins::Error,
        },

        #[snafu(display("{}", source))]
        Dispatch {
            source: cloud_config_plugins::Error,
        },

        #[snafu(display("Logger setup error: {}", source))]
        Logger { source: log::SetLoggerError },

        #[snafu(display("Error serializing run report: {}", source))]
        Report { source: serde_json::Error },
    }
}

type Result<T> = std::result::Result<T, error::Error>;
