//! The chrony module implements `Executor` for Linux hosts running chronyd.

use crate::command;
use crate::error;
use crate::{Executor, ExecutorConfig, Result};
use snafu::{ensure, ResultExt};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

/// Settings written below the server list; they match what chronyd ships with.
const CHRONY_DEFAULTS: &str = "\
driftfile /var/lib/chrony/drift
makestep 1.0 3
rtcsync
";

/// Replaces `path` with `contents`.  The new contents are staged in a temporary file in
/// `staging_dir` and renamed over `path`, so chronyd never sees a partial file, and the old file is
/// left untouched if anything fails before the rename.  `staging_dir` must be on the same
/// filesystem as `path`.
fn write_config(path: &Path, staging_dir: &Path, contents: &str) -> Result<()> {
    let mut staged = NamedTempFile::new_in(staging_dir).context(error::CreateTempfileSnafu {
        path: staging_dir,
    })?;
    staged
        .write_all(contents.as_bytes())
        .context(error::WriteConfigSnafu { path: staged.path() })?;
    staged
        .persist(path)
        .context(error::PersistConfigSnafu { path })?;
    Ok(())
}

/// Configures time synchronization by rewriting chrony.conf and restarting chronyd.
#[derive(Debug, Clone)]
pub struct ChronyExecutor {
    conf_path: PathBuf,
    systemctl: PathBuf,
    service: String,
    restart_service: bool,
}

impl ChronyExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            conf_path: config.chrony_conf.clone(),
            systemctl: config.systemctl.clone(),
            service: config.time_service.clone(),
            restart_service: config.restart_time_service,
        }
    }

    /// Renders a complete chrony.conf using the given servers, in order.
    fn render(servers: &[String]) -> String {
        let mut conf = String::from("# Generated by cloud-config\n");
        for server in servers {
            // Writing to a String can't fail.
            let _ = writeln!(conf, "server {} iburst", server);
        }
        conf.push_str(CHRONY_DEFAULTS);
        conf
    }

    /// Restarts the time service if it's running, so it picks up the new configuration.
    fn restart(&self) -> Result<()> {
        let mut command = Command::new(&self.systemctl);
        command.args(["try-restart", &self.service]);
        command::run(command)?;
        Ok(())
    }
}

impl Executor for ChronyExecutor {
    fn set_ntp_servers(&self, servers: &[String]) -> Result<()> {
        ensure!(!servers.is_empty(), error::NoServersSnafu);

        debug!("Writing {}", self.conf_path.display());
        let staging_dir = match self.conf_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        write_config(&self.conf_path, staging_dir, &Self::render(servers))?;

        if self.restart_service {
            info!("Restarting {}", self.service);
            self.restart()?;
        }
        Ok(())
    }
}
