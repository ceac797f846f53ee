//! The w32time module implements `Executor` for Windows through the `w32tm` tool.

use crate::command;
use crate::error;
use crate::{Executor, ExecutorConfig, Result};
use snafu::ensure;
use std::path::PathBuf;
use std::process::Command;

/// Configures the Windows Time service to sync from a manual peer list.
#[derive(Debug, Clone)]
pub struct W32TimeExecutor {
    w32tm: PathBuf,
}

impl W32TimeExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            w32tm: config.w32tm.clone(),
        }
    }

    /// `w32tm` takes its peers as one space-separated argument.
    fn config_args(servers: &[String]) -> Vec<String> {
        vec![
            "/config".to_string(),
            format!("/manualpeerlist:{}", servers.join(" ")),
            "/syncfromflags:manual".to_string(),
            "/update".to_string(),
        ]
    }
}

impl Executor for W32TimeExecutor {
    fn set_ntp_servers(&self, servers: &[String]) -> Result<()> {
        ensure!(!servers.is_empty(), error::NoServersSnafu);

        let mut command = Command::new(&self.w32tm);
        command.args(Self::config_args(servers));
        command::run(command)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;

    #[test]
    fn peer_list() {
        let args = W32TimeExecutor::config_args(&[
            "10.0.0.1".to_string(),
            "time.windows.com".to_string(),
        ]);
        assert_eq!(
            args,
            vec![
                "/config",
                "/manualpeerlist:10.0.0.1 time.windows.com",
                "/syncfromflags:manual",
                "/update"
            ]
        );
    }

    #[test]
    fn empty_list_is_rejected() {
        let executor = W32TimeExecutor::new(&ExecutorConfig::default());
        assert!(matches!(
            executor.set_ntp_servers(&[]).unwrap_err(),
            Error::NoServers
        ));
    }
}
