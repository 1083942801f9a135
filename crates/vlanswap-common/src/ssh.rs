//! SSH implementation of [`CommandChannel`].
//!
//! Opens a PTY shell on the device and drives it by prompt matching. Every
//! command is written as a line; its reply starts after the echoed command
//! and runs until the device prompt (or an expected token) shows up.
//! Anything the device printed before the echo belongs to an earlier
//! exchange and is dropped.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use russh::client::{self, AuthResult, Handle};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg, Disconnect};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};

use crate::channel::{CommandChannel, Connector, DeviceCredentials, DeviceType};
use crate::error::{SessionError, SessionResult};

/// Default time to wait for a prompt before giving up.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// How long the device must stay silent before pending output counts as
/// fully read.
pub const SETTLE_INTERVAL: Duration = Duration::from_millis(250);

/// Matches a device prompt at the very end of the read buffer.
/// Covers exec (`sw1>`), privileged (`sw1#`) and config (`sw1(config-if)#`).
static PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.\-@/:()]+[>#]\s*$").expect("Invalid regex pattern"));

/// Matches a password challenge at the end of the read buffer.
static PASSWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)password:\s*$").expect("Invalid regex pattern"));

/// Returns true if `text` ends with a device prompt.
pub fn ends_with_prompt(text: &str) -> bool {
    PROMPT_RE.is_match(text)
}

/// Returns the text following the echo of `command`, or `None` while the
/// echo has not arrived yet.
///
/// The echo is the first line that is the command itself or a prompt
/// followed by the command.
pub fn output_after_echo<'a>(text: &'a str, command: &str) -> Option<&'a str> {
    let command = command.trim();
    if command.is_empty() {
        return Some(text);
    }
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        let Some(head) = line.trim_end().strip_suffix(command) else {
            continue;
        };
        if head.is_empty() || head.ends_with(['#', '>', ' ']) {
            return Some(&text[offset..]);
        }
    }
    None
}

/// Removes a trailing prompt line from command output.
pub fn strip_prompt(output: &str) -> String {
    let mut lines: Vec<&str> = output.lines().collect();
    if lines.last().is_some_and(|line| ends_with_prompt(line)) {
        lines.pop();
    }
    lines.join("\n")
}

/// Opens SSH command channels with password authentication.
pub struct SshConnector {
    config: Arc<client::Config>,
    read_timeout: Duration,
}

impl SshConnector {
    /// Creates a connector whose channels wait at most `read_timeout`
    /// for any single prompt.
    pub fn new(read_timeout: Duration) -> Self {
        let config = client::Config {
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..Default::default()
        };
        Self {
            config: Arc::new(config),
            read_timeout,
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT)
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Channel = SshChannel;

    #[instrument(skip(self), fields(address = %credentials.address))]
    async fn connect(&self, credentials: &DeviceCredentials) -> SessionResult<SshChannel> {
        let address = SocketAddr::from((credentials.address, credentials.port));
        let address_str = credentials.address.to_string();

        let connecting = client::connect(self.config.clone(), address, TrustingHandler);
        let mut handle = tokio::time::timeout(self.read_timeout, connecting)
            .await
            .map_err(|_| SessionError::connect(&address_str, "connection timed out"))?
            .map_err(|e| SessionError::connect(&address_str, e.to_string()))?;

        let auth = handle
            .authenticate_password(credentials.username.clone(), credentials.password.clone())
            .await
            .map_err(|e| SessionError::connect(&address_str, e.to_string()))?;
        if !matches!(auth, AuthResult::Success) {
            return Err(SessionError::auth(&address_str, &credentials.username));
        }
        debug!(username = %credentials.username, "Password authentication succeeded");

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SessionError::connect(&address_str, e.to_string()))?;
        channel
            .request_pty(false, "vt100", 200, 24, 0, 0, &[])
            .await
            .map_err(|e| SessionError::connect(&address_str, e.to_string()))?;
        channel
            .request_shell(false)
            .await
            .map_err(|e| SessionError::connect(&address_str, e.to_string()))?;

        Ok(SshChannel {
            handle,
            channel,
            buffer: Vec::new(),
            device_type: credentials.device_type,
            read_timeout: self.read_timeout,
        })
    }
}

/// A PTY shell on a device, driven line by line.
///
/// The login banner and first prompt are still pending when the channel is
/// handed out; [`CommandChannel::find_prompt`] consumes them.
pub struct SshChannel {
    handle: Handle<TrustingHandler>,
    channel: Channel<client::Msg>,
    buffer: Vec<u8>,
    device_type: DeviceType,
    read_timeout: Duration,
}

impl SshChannel {
    async fn write_line(&mut self, line: &str) -> SessionResult<()> {
        trace!(line = %line, "Sending line");
        self.channel
            .data(format!("{}\n", line).as_bytes())
            .await
            .map_err(|e| SessionError::transport("send", e.to_string()))
    }

    /// Reads until `done` holds for the buffered text, then hands the
    /// buffered text back and empties the buffer.
    async fn read_until<F>(&mut self, waiting_for: &str, mut done: F) -> SessionResult<String>
    where
        F: FnMut(&str) -> bool,
    {
        let deadline = Instant::now() + self.read_timeout;
        loop {
            let text = String::from_utf8_lossy(&self.buffer).replace('\r', "");
            if done(&text) {
                self.buffer.clear();
                return Ok(text);
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| SessionError::timeout(waiting_for, self.read_timeout.as_secs()))?;
            match msg {
                Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                    self.buffer.extend_from_slice(&data);
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(SessionError::channel_closed(waiting_for));
                }
                Some(other) => trace!(?other, "Ignoring channel message"),
            }
        }
    }

    /// Reads until the device has been quiet for [`SETTLE_INTERVAL`] and
    /// hands back everything that arrived, emptying the buffer.
    async fn read_until_quiet(&mut self) -> SessionResult<String> {
        let deadline = Instant::now() + self.read_timeout;
        loop {
            let wait = SETTLE_INTERVAL.min(deadline.saturating_duration_since(Instant::now()));
            if wait.is_zero() {
                // Never went quiet; hand back what arrived.
                break;
            }
            match tokio::time::timeout(wait, self.channel.wait()).await {
                Err(_) => break,
                Ok(Some(ChannelMsg::Data { data }))
                | Ok(Some(ChannelMsg::ExtendedData { data, .. })) => {
                    self.buffer.extend_from_slice(&data);
                }
                Ok(Some(ChannelMsg::Eof)) | Ok(Some(ChannelMsg::Close)) | Ok(None) => {
                    return Err(SessionError::channel_closed("quiet channel"));
                }
                Ok(Some(other)) => trace!(?other, "Ignoring channel message"),
            }
        }
        let text = String::from_utf8_lossy(&self.buffer).replace('\r', "");
        self.buffer.clear();
        Ok(text)
    }

    /// Writes `command` and reads until the reply after its echo satisfies
    /// `done`. Returns the reply without the echo.
    async fn exchange<F>(
        &mut self,
        command: &str,
        waiting_for: &str,
        mut done: F,
    ) -> SessionResult<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.write_line(command).await?;
        let raw = self
            .read_until(waiting_for, |text| match output_after_echo(text, command) {
                Some(reply) => done(reply),
                None => false,
            })
            .await?;
        Ok(output_after_echo(&raw, command).unwrap_or(&raw).to_string())
    }

    async fn exchange_to_prompt(&mut self, command: &str) -> SessionResult<String> {
        let waiting_for = format!("prompt after '{}'", command);
        self.exchange(command, &waiting_for, ends_with_prompt).await
    }
}

#[async_trait]
impl CommandChannel for SshChannel {
    async fn find_prompt(&mut self) -> SessionResult<String> {
        let pending = self.read_until_quiet().await?;
        trace!(pending = %pending, "Discarded pending output");

        self.write_line("").await?;
        let mut text = self.read_until("device prompt", ends_with_prompt).await?;
        // Prompts answering earlier input may still be on their way.
        text.push_str(&self.read_until_quiet().await?);

        let prompt = text
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| ends_with_prompt(line))
            .unwrap_or_default()
            .to_string();
        debug!(prompt = %prompt, "Found prompt");
        Ok(prompt)
    }

    #[instrument(skip(self))]
    async fn send_command(&mut self, command: &str) -> SessionResult<String> {
        let reply = self.exchange_to_prompt(command).await?;
        Ok(strip_prompt(&reply))
    }

    #[instrument(skip(self))]
    async fn send_command_expect(&mut self, command: &str, expect: &str) -> SessionResult<String> {
        let waiting_for = format!("'{}' after '{}'", expect, command);
        let reply = self
            .exchange(command, &waiting_for, |reply| {
                reply.contains(expect) && ends_with_prompt(reply)
            })
            .await?;
        Ok(strip_prompt(&reply))
    }

    #[instrument(skip(self, commands), fields(count = commands.len()))]
    async fn send_config_set(&mut self, commands: &[String]) -> SessionResult<String> {
        let enter = self.device_type.config_enter_command();
        let exit = self.device_type.config_exit_command();

        let mut transcript = String::new();
        for command in std::iter::once(enter)
            .chain(commands.iter().map(String::as_str))
            .chain(std::iter::once(exit))
        {
            let reply = self.exchange_to_prompt(command).await?;
            transcript.push_str(command);
            transcript.push('\n');
            transcript.push_str(&reply);
            transcript.push('\n');
        }
        Ok(transcript)
    }

    async fn enable(&mut self, secret: &str) -> SessionResult<()> {
        let command = self.device_type.enable_command();
        let reply = self
            .exchange(command, "enable reply", |reply| {
                ends_with_prompt(reply) || PASSWORD_RE.is_match(reply)
            })
            .await?;
        if PASSWORD_RE.is_match(&reply) {
            // The secret is not echoed, so its reply is read as is.
            self.write_line(secret).await?;
            // A rejected secret re-prompts; blank answers run IOS out of retries.
            loop {
                let reply = self
                    .read_until("enable result", |text| {
                        ends_with_prompt(text) || PASSWORD_RE.is_match(text)
                    })
                    .await?;
                if !PASSWORD_RE.is_match(&reply) {
                    break;
                }
                warn!("Enable secret rejected");
                self.write_line("").await?;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> SessionResult<()> {
        if let Err(e) = self.channel.close().await {
            debug!(error = %e, "Channel close failed, disconnecting anyway");
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| SessionError::transport("disconnect", e.to_string()))
    }
}

/// Accepts any host key, like an interactive first-time login would.
struct TrustingHandler;

impl client::Handler for TrustingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        // TODO: known_hosts verification.
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prompt_detection() {
        assert!(ends_with_prompt("core-sw1#"));
        assert!(ends_with_prompt("output\ncore-sw1> "));
        assert!(ends_with_prompt("core-sw1(config)#"));
        assert!(ends_with_prompt("core-sw1(config-if)#"));
        assert!(!ends_with_prompt("Building configuration..."));
        assert!(!ends_with_prompt("Password: "));
    }

    #[test]
    fn test_password_challenge() {
        assert!(PASSWORD_RE.is_match("enable\nPassword: "));
        assert!(!PASSWORD_RE.is_match("core-sw1#"));
    }

    #[test]
    fn test_output_after_echo() {
        let text = "sw1#\nsw1#terminal length 0\nsw1#";
        assert_eq!(output_after_echo(text, "terminal length 0"), Some("sw1#"));
    }

    #[test]
    fn test_output_waits_for_echo() {
        // Reply to an earlier blank line, nothing for the new command yet.
        assert_eq!(output_after_echo("\nsw1#", "show interfaces status"), None);
        assert_eq!(output_after_echo("sw1#show interfaces st", "show interfaces status"), None);
    }

    #[test]
    fn test_echo_must_follow_prompt() {
        let text = "Description: uplink end\nsw1(config-if)#end\nsw1#";
        assert_eq!(output_after_echo(text, "end"), Some("sw1#"));
    }

    #[test]
    fn test_config_echo() {
        let text = "sw1(config)#interface Gi1/0/1\nsw1(config-if)#";
        assert_eq!(
            output_after_echo(text, "interface Gi1/0/1"),
            Some("sw1(config-if)#")
        );
    }

    #[test]
    fn test_strip_prompt() {
        let reply = "*10:02:11.123 UTC Mon Oct 19 2026\ncore-sw1#";
        assert_eq!(strip_prompt(reply), "*10:02:11.123 UTC Mon Oct 19 2026");
        assert_eq!(strip_prompt("core-sw1#"), "");
    }

    #[test]
    fn test_strip_prompt_keeps_output() {
        let reply = "Building configuration...\n[OK]\ncore-sw1#";
        assert_eq!(strip_prompt(reply), "Building configuration...\n[OK]");
    }
}
