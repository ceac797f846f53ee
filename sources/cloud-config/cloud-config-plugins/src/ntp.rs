//! The ntp module implements `CloudConfigPlugin` for the `ntp` directive, which sets the hosts the
//! system synchronizes its clock with.

use crate::document::value_kind;
use crate::error;
use crate::{CloudConfigPlugin, ExecutionResult, Result};
use osutils::Executor;
use serde_yaml::{Mapping, Value};
use snafu::ResultExt;

/// Name of the directive handled by `NtpPlugin`.
pub const NTP_DIRECTIVE: &str = "ntp";

/// Handles:
///
/// ```yaml
/// ntp:
///   servers: [...]
///   pools: [...]
/// ```
///
/// Servers come first in the resulting host list, then pools.
#[derive(Debug, Default, Clone, Copy)]
pub struct NtpPlugin;

impl CloudConfigPlugin for NtpPlugin {
    fn process(&self, data: &Value, executor: &dyn Executor) -> Result<ExecutionResult> {
        let hosts = ntp_hosts(data)?;

        if hosts.is_empty() {
            info!("No NTP servers or pools given, leaving time synchronization alone");
            return Ok(ExecutionResult::NoRebootRequired);
        }

        info!("{}", change_message(&hosts));
        executor
            .set_ntp_servers(&hosts)
            .context(error::ExecutionSnafu {
                directive: NTP_DIRECTIVE,
            })?;

        Ok(ExecutionResult::NoRebootRequired)
    }
}

/// The info line logged for every NTP change.
fn change_message(hosts: &[String]) -> String {
    format!("Changing NTP servers to {}", hosts.join(", "))
}

/// Collects `servers` followed by `pools` from the directive value.
fn ntp_hosts(data: &Value) -> Result<Vec<String>> {
    let table = match data {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(table) => table,
        other => {
            return malformed(format!("expected a mapping, found {}", value_kind(other)));
        }
    };

    let mut hosts = host_list(table, "servers")?;
    hosts.extend(host_list(table, "pools")?);
    Ok(hosts)
}

/// Reads an optional list of host names; a missing or null field is an empty list.
fn host_list(table: &Mapping, field: &str) -> Result<Vec<String>> {
    let entries = match table.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(entries)) => entries,
        Some(other) => {
            return malformed(format!(
                "'{}' must be a list, found {}",
                field,
                value_kind(other)
            ));
        }
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::String(host) => valid_host(field, host),
            other => malformed(format!(
                "'{}' entries must be host names, found {}",
                field,
                value_kind(other)
            )),
        })
        .collect()
}

/// Host names end up as single tokens in OS configuration, so they can't be empty or contain
/// whitespace or control characters.
fn valid_host(field: &str, host: &str) -> Result<String> {
    let host = host.trim();
    if host.is_empty() {
        return malformed(format!("'{}' contains an empty host name", field));
    }
    if host.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return malformed(format!(
            "'{}' contains {:?}, host names can't contain whitespace or control characters",
            field, host
        ));
    }
    Ok(host.to_string())
}

fn malformed<T>(message: String) -> Result<T> {
    error::MalformedDirectiveSnafu {
        directive: NTP_DIRECTIVE,
        message,
    }
    .fail()
}
