//! Recording fakes for the device channel and name resolver
//!
//! A [`FakeConnector`] hands out [`FakeChannel`]s that answer from a
//! [`FakeDevice`] script and record every call into a shared [`CallLog`],
//! so a test can inspect the traffic after the session is gone.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use vlanswap_common::{
    CommandChannel, Connector, DeviceCredentials, Resolver, SessionError, SessionResult,
};

/// Read timeout reported by fake timeouts.
const FAKE_TIMEOUT_SECS: u64 = 60;

/// One call made against the fake device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    /// Connector::connect
    Connect {
        address: Ipv4Addr,
        port: u16,
        username: String,
    },
    /// CommandChannel::find_prompt
    FindPrompt,
    /// CommandChannel::send_command
    Command(String),
    /// CommandChannel::send_command_expect
    CommandExpect { command: String, expect: String },
    /// CommandChannel::send_config_set
    ConfigSet(Vec<String>),
    /// CommandChannel::enable
    Enable { secret: String },
    /// CommandChannel::close
    Close,
}

/// Shared, ordered record of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<ChannelCall>>>);

impl CallLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: ChannelCall) {
        self.0.lock().expect("call log poisoned").push(call);
    }

    /// All calls in order
    pub fn calls(&self) -> Vec<ChannelCall> {
        self.0.lock().expect("call log poisoned").clone()
    }

    /// Exec-mode commands sent, with or without an expected token
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChannelCall::Command(command) => Some(command),
                ChannelCall::CommandExpect { command, .. } => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Configuration batches sent
    pub fn config_sets(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChannelCall::ConfigSet(commands) => Some(commands),
                _ => None,
            })
            .collect()
    }

    /// Number of connection attempts
    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ChannelCall::Connect { .. }))
            .count()
    }

    /// Number of times a channel was closed
    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ChannelCall::Close))
            .count()
    }
}

/// Scripted behaviour of the fake switch.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    hostname: String,
    privileged: bool,
    enable_secret: Option<String>,
    responses: HashMap<String, String>,
    config_reply: String,
    unreachable: bool,
    refuse_login: bool,
    prompt_missing: bool,
    failing_on: Option<String>,
}

impl FakeDevice {
    /// A reachable switch that logs in straight to privileged mode and
    /// saves its configuration successfully.
    pub fn new(hostname: impl Into<String>) -> Self {
        let mut responses = HashMap::new();
        responses.insert("terminal length 0".to_string(), String::new());
        responses.insert(
            "write memory".to_string(),
            "Building configuration...\n[OK]".to_string(),
        );
        Self {
            hostname: hostname.into(),
            privileged: true,
            enable_secret: None,
            responses,
            config_reply: String::new(),
            unreachable: false,
            refuse_login: false,
            prompt_missing: false,
            failing_on: None,
        }
    }

    /// Log in to user exec mode (`>` prompt)
    pub fn unprivileged(mut self) -> Self {
        self.privileged = false;
        self
    }

    /// Only this secret escalates; without one any secret does
    pub fn with_enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(secret.into());
        self
    }

    /// Reply to an exec command
    pub fn with_response(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.responses.insert(command.into(), output.into());
        self
    }

    /// Reply to `show interfaces status`
    pub fn with_status(self, output: impl Into<String>) -> Self {
        self.with_response("show interfaces status", output)
    }

    /// Transcript returned for every configuration batch
    pub fn with_config_reply(mut self, output: impl Into<String>) -> Self {
        self.config_reply = output.into();
        self
    }

    /// Refuse the TCP connection
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Reject the login
    pub fn refusing_login(mut self) -> Self {
        self.refuse_login = true;
        self
    }

    /// Never show a prompt
    pub fn without_prompt(mut self) -> Self {
        self.prompt_missing = true;
        self
    }

    /// Drop the transport when this command (or a batch containing it, or
    /// `configure terminal` for any batch) is sent. `enable` makes
    /// escalation time out instead.
    pub fn failing_on(mut self, command: impl Into<String>) -> Self {
        self.failing_on = Some(command.into());
        self
    }

    fn prompt(&self) -> String {
        let marker = if self.privileged { '#' } else { '>' };
        format!("{}{}", self.hostname, marker)
    }

    fn fails_on(&self, command: &str) -> bool {
        self.failing_on.as_deref() == Some(command)
    }
}

/// Connector handing out [`FakeChannel`]s for one [`FakeDevice`].
#[derive(Debug, Clone)]
pub struct FakeConnector {
    device: FakeDevice,
    log: CallLog,
}

impl FakeConnector {
    /// Create a connector for `device`
    pub fn new(device: FakeDevice) -> Self {
        Self {
            device,
            log: CallLog::new(),
        }
    }

    /// The log shared by every channel this connector opened
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Channel = FakeChannel;

    async fn connect(&self, credentials: &DeviceCredentials) -> SessionResult<FakeChannel> {
        self.log.record(ChannelCall::Connect {
            address: credentials.address,
            port: credentials.port,
            username: credentials.username.clone(),
        });
        let address = credentials.address.to_string();
        if self.device.unreachable {
            return Err(SessionError::connect(address, "connection refused"));
        }
        if self.device.refuse_login {
            return Err(SessionError::auth(address, &credentials.username));
        }
        Ok(FakeChannel {
            device: self.device.clone(),
            log: self.log.clone(),
        })
    }
}

/// Channel answering from a [`FakeDevice`] script.
#[derive(Debug)]
pub struct FakeChannel {
    device: FakeDevice,
    log: CallLog,
}

#[async_trait]
impl CommandChannel for FakeChannel {
    async fn find_prompt(&mut self) -> SessionResult<String> {
        self.log.record(ChannelCall::FindPrompt);
        if self.device.prompt_missing {
            return Err(SessionError::timeout("device prompt", FAKE_TIMEOUT_SECS));
        }
        Ok(self.device.prompt())
    }

    async fn send_command(&mut self, command: &str) -> SessionResult<String> {
        self.log.record(ChannelCall::Command(command.to_string()));
        if self.device.fails_on(command) {
            return Err(SessionError::transport("send", "broken pipe"));
        }
        Ok(self.device.responses.get(command).cloned().unwrap_or_default())
    }

    async fn send_command_expect(&mut self, command: &str, expect: &str) -> SessionResult<String> {
        self.log.record(ChannelCall::CommandExpect {
            command: command.to_string(),
            expect: expect.to_string(),
        });
        if self.device.fails_on(command) {
            return Err(SessionError::transport("send", "broken pipe"));
        }
        let output = self.device.responses.get(command).cloned().unwrap_or_default();
        if !output.contains(expect) {
            return Err(SessionError::timeout(
                format!("'{}' after '{}'", expect, command),
                FAKE_TIMEOUT_SECS,
            ));
        }
        Ok(output)
    }

    async fn send_config_set(&mut self, commands: &[String]) -> SessionResult<String> {
        self.log.record(ChannelCall::ConfigSet(commands.to_vec()));
        if self.device.fails_on("configure terminal")
            || commands.iter().any(|command| self.device.fails_on(command))
        {
            return Err(SessionError::transport("send", "broken pipe"));
        }
        Ok(self.device.config_reply.clone())
    }

    async fn enable(&mut self, secret: &str) -> SessionResult<()> {
        self.log.record(ChannelCall::Enable {
            secret: secret.to_string(),
        });
        if self.device.fails_on("enable") {
            return Err(SessionError::timeout("enable result", FAKE_TIMEOUT_SECS));
        }
        let accepted = match &self.device.enable_secret {
            Some(expected) => expected == secret,
            None => true,
        };
        if accepted {
            self.device.privileged = true;
        }
        Ok(())
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.log.record(ChannelCall::Close);
        Ok(())
    }
}

/// Resolver answering from a fixed host table and recording lookups.
#[derive(Debug, Clone, Default)]
pub struct FakeResolver {
    hosts: HashMap<String, Ipv4Addr>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl FakeResolver {
    /// A resolver that knows no hosts
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host
    pub fn with_host(mut self, name: impl Into<String>, address: Ipv4Addr) -> Self {
        self.hosts.insert(name.into(), address);
        self
    }

    /// Names looked up so far
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("lookup log poisoned").clone()
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn lookup(&self, name: &str) -> Option<Ipv4Addr> {
        self.lookups
            .lock()
            .expect("lookup log poisoned")
            .push(name.to_string());
        self.hosts.get(name).copied()
    }
}
