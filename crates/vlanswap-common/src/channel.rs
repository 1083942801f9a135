//! Device command channel abstractions.
//!
//! A [`CommandChannel`] is an authenticated, prompt-driven command line on a
//! network device. A [`Connector`] opens one from [`DeviceCredentials`].
//! The SSH implementation lives in [`crate::ssh`]; tests substitute a
//! recording fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use crate::error::SessionResult;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Device command dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Cisco IOS / IOS-XE switches.
    #[default]
    CiscoIos,
}

impl DeviceType {
    /// Returns the dialect name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::CiscoIos => "cisco_ios",
        }
    }

    /// Command that requests privileged mode.
    pub fn enable_command(&self) -> &'static str {
        match self {
            DeviceType::CiscoIos => "enable",
        }
    }

    /// Command that turns off output pagination.
    pub fn paging_command(&self) -> &'static str {
        match self {
            DeviceType::CiscoIos => "terminal length 0",
        }
    }

    /// Command that enters global configuration mode.
    pub fn config_enter_command(&self) -> &'static str {
        match self {
            DeviceType::CiscoIos => "configure terminal",
        }
    }

    /// Command that leaves configuration mode.
    pub fn config_exit_command(&self) -> &'static str {
        match self {
            DeviceType::CiscoIos => "end",
        }
    }

    /// Returns true if `prompt` is a privileged-mode prompt.
    pub fn is_privileged_prompt(&self, prompt: &str) -> bool {
        match self {
            DeviceType::CiscoIos => prompt.trim_end().ends_with('#'),
        }
    }

    /// Strips the mode marker from a prompt, leaving the hostname.
    pub fn hostname_from_prompt<'a>(&self, prompt: &'a str) -> &'a str {
        match self {
            DeviceType::CiscoIos => prompt.trim().trim_end_matches(['#', '>']),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to open a session on one device.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceCredentials {
    /// Command dialect of the device.
    pub device_type: DeviceType,
    /// Resolved IPv4 address.
    pub address: Ipv4Addr,
    /// SSH port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login password. Also answers the enable challenge.
    pub password: String,
}

impl DeviceCredentials {
    /// Creates credentials for a Cisco IOS device on the default SSH port.
    pub fn new(address: Ipv4Addr, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            device_type: DeviceType::CiscoIos,
            address,
            port: DEFAULT_SSH_PORT,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Overrides the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Debug for DeviceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredentials")
            .field("device_type", &self.device_type)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A prompt-driven command line on a connected device.
///
/// Every call blocks until the device has answered and is showing a prompt
/// again, or until the implementation's read timeout elapses.
#[async_trait]
pub trait CommandChannel: Send {
    /// Returns the current prompt line (e.g. `Switch#`).
    async fn find_prompt(&mut self) -> SessionResult<String>;

    /// Runs one exec-mode command and returns its output without the
    /// command echo and trailing prompt.
    async fn send_command(&mut self, command: &str) -> SessionResult<String>;

    /// Runs one command and waits until `expect` appears in the reply.
    async fn send_command_expect(&mut self, command: &str, expect: &str) -> SessionResult<String>;

    /// Enters configuration mode, sends every command in order, leaves
    /// configuration mode, and returns the full transcript.
    async fn send_config_set(&mut self, commands: &[String]) -> SessionResult<String>;

    /// Requests privileged mode, answering a password challenge with `secret`.
    ///
    /// Succeeds once the request was sent; callers re-check the prompt to see
    /// whether escalation took effect.
    async fn enable(&mut self, secret: &str) -> SessionResult<()>;

    /// Closes the channel and the underlying transport.
    async fn close(&mut self) -> SessionResult<()>;
}

/// Opens command channels.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The channel type produced by this connector.
    type Channel: CommandChannel;

    /// Opens the transport and authenticates.
    async fn connect(&self, credentials: &DeviceCredentials) -> SessionResult<Self::Channel>;
}
