/*!
# Introduction

cloud-config-plugins applies cloud-config user data to the host.

User data is parsed into a `ConfigDocument`, an ordered map of directive names to values.  A
`Dispatcher` walks the document in order, looks up the `CloudConfigPlugin` registered for each
directive, and runs it against the injected `osutils::Executor`.  Directives nobody handles are
skipped.  What happens when a plugin fails is up to the dispatcher's `ErrorPolicy`.

The only plugin currently provided is `NtpPlugin`, which handles the `ntp` directive:

```yaml
#cloud-config
ntp:
  servers: ["10.0.0.1"]
  pools: ["0.pool.ntp.org"]
```
*/

#[macro_use]
extern crate log;

mod dispatch;
mod document;
mod ntp;
mod plugin;
mod registry;
pub mod user_data;

pub use dispatch::{
    DispatchReport, Dispatcher, ErrorPolicy, FailedDirective, SkipReason, SkippedDirective,
};
pub use document::{is_cloud_config, ConfigDocument, Directive, CLOUD_CONFIG_HEADER};
pub use ntp::{NtpPlugin, NTP_DIRECTIVE};
pub use plugin::{CloudConfigPlugin, ExecutionResult};
pub use registry::PluginRegistry;

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(crate)))]
    pub enum Error {
        #[snafu(display("Malformed '{}' directive: {}", directive, message))]
        MalformedDirective { directive: String, message: String },

        #[snafu(display("Failed to apply '{}' directive: {}", directive, source))]
        Execution {
            directive: String,
            source: osutils::Error,
        },

        #[snafu(display("Directive '{}' failed, not processing the rest: {}", directive, source))]
        DirectiveFailed {
            directive: String,
            #[snafu(source(from(Error, Box::new)))]
            source: Box<Error>,
        },

        #[snafu(display("Unable to parse user data as YAML: {}", source))]
        UserDataParse { source: serde_yaml::Error },

        #[snafu(display("User data has a non-string top-level key: {}", key))]
        NonStringKey { key: String },

        #[snafu(display("Unable to read user data from '{}': {}", path.display(), source))]
        UserDataRead { path: PathBuf, source: io::Error },
    }
}

pub use error::Error;
pub type Result<T> = std::result::Result<T, error::Error>;
