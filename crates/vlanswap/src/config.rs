//! Run configuration for the workflow driver

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use vlanswap_common::{Template, DEFAULT_READ_TIMEOUT, DEFAULT_SSH_PORT};

use crate::tables::{default_status_template, load_status_template, TableResult};

/// DNS suffix appended to bare device names.
pub const DEFAULT_DOMAIN: &str = "gnf.org";

/// Settings for one run of the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// DNS suffix for device names.
    pub domain: String,
    /// SSH port on the device.
    pub port: u16,
    /// Status grammar file; the built-in IOS grammar when unset.
    pub template: Option<PathBuf>,
    /// Longest wait for any single device prompt.
    pub read_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            port: DEFAULT_SSH_PORT,
            template: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl WorkflowConfig {
    /// Sets the DNS suffix.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Sets the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Uses the status grammar at `path`.
    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(path.into());
        self
    }

    /// Sets the prompt timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Compiles the configured status grammar.
    pub fn status_template(&self) -> TableResult<Template> {
        match &self.template {
            Some(path) => load_status_template(path),
            None => default_status_template(),
        }
    }
}
