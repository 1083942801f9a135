//! Common infrastructure for vlanswap.
//!
//! This crate holds the collaborators the VLAN reassignment workflow talks
//! to, each behind a trait so tests can substitute them:
//!
//! - [`channel`]: the device command channel and connector traits
//! - [`ssh`]: SSH implementation of the command channel
//! - [`resolve`]: device name to IPv4 address resolution
//! - [`operator`]: operator prompts and status lines
//! - [`template`]: TextFSM-style table templates for command output
//! - [`error`]: error types for the above
//!
//! # Example
//!
//! ```ignore
//! use vlanswap_common::{CommandChannel, Connector, DeviceCredentials, SshConnector};
//!
//! async fn show_status(creds: &DeviceCredentials) -> vlanswap_common::SessionResult<String> {
//!     let mut channel = SshConnector::default().connect(creds).await?;
//!     channel.find_prompt().await?;
//!     let output = channel.send_command("show interfaces status").await?;
//!     channel.close().await?;
//!     Ok(output)
//! }
//! ```

pub mod channel;
pub mod error;
pub mod operator;
pub mod resolve;
pub mod ssh;
pub mod template;

// Re-export commonly used items at crate root
pub use channel::{CommandChannel, Connector, DeviceCredentials, DeviceType, DEFAULT_SSH_PORT};
pub use error::{SessionError, SessionResult, TemplateError, TemplateResult};
pub use operator::{is_exit, parse_yes_no, Operator, TerminalOperator};
pub use resolve::{qualify, HostQuery, Resolver, SystemResolver};
pub use ssh::{SshChannel, SshConnector, DEFAULT_READ_TIMEOUT};
pub use template::Template;
