//! DeviceSession - one authenticated command session on one switch

use std::fmt;
use std::net::Ipv4Addr;
use tracing::{debug, info, instrument, warn};

use vlanswap_common::{
    parse_yes_no, CommandChannel, Connector, DeviceCredentials, DeviceType, Operator,
    SessionError, SessionResult,
};

use crate::commands::{SAVE_COMPLETE_TOKEN, SAVE_CONFIG_CMD};

const ENABLE_CONSENT_PROMPT: &str = "You're not in enable mode. Enter 'y' for enable";

/// Lifecycle of a [`DeviceSession`].
///
/// `Connected → PrivilegeChecked → Ready → {ConfigApplied → Saved | ConfigFailed} → Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open and authenticated.
    Connected,
    /// Privilege level inspected (and escalation attempted if allowed).
    PrivilegeChecked,
    /// Paging disabled; ready for commands.
    Ready,
    /// A configuration batch was pushed.
    ConfigApplied,
    /// The pushed batch looked wrong; it must not be saved.
    ConfigFailed,
    /// Running configuration written to startup.
    Saved,
    /// Transport released. Terminal.
    Disconnected,
}

impl SessionState {
    /// Returns the state name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Connected => "connected",
            SessionState::PrivilegeChecked => "privilege_checked",
            SessionState::Ready => "ready",
            SessionState::ConfigApplied => "config_applied",
            SessionState::ConfigFailed => "config_failed",
            SessionState::Saved => "saved",
            SessionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wraps a [`CommandChannel`] with the session lifecycle.
///
/// Every operation after [`DeviceSession::disconnect`] fails with
/// [`SessionError::Disconnected`].
pub struct DeviceSession<C: CommandChannel> {
    channel: C,
    device_type: DeviceType,
    address: Ipv4Addr,
    hostname: String,
    /// Answers the enable challenge.
    secret: String,
    state: SessionState,
}

impl<C: CommandChannel> DeviceSession<C> {
    /// Opens a session and reads the device hostname from its prompt.
    #[instrument(skip(connector, credentials), fields(address = %credentials.address))]
    pub async fn connect<K>(connector: &K, credentials: &DeviceCredentials) -> SessionResult<Self>
    where
        K: Connector<Channel = C>,
    {
        let mut channel = connector.connect(credentials).await?;

        let prompt = match channel.find_prompt().await {
            Ok(prompt) => prompt,
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    debug!(error = %close_err, "Close after failed prompt read also failed");
                }
                return Err(e);
            }
        };
        let hostname = credentials
            .device_type
            .hostname_from_prompt(&prompt)
            .to_string();

        info!(hostname = %hostname, "Device session connected");
        Ok(Self {
            channel,
            device_type: credentials.device_type,
            address: credentials.address,
            hostname,
            secret: credentials.password.clone(),
            state: SessionState::Connected,
        })
    }

    /// Hostname taken from the prompt at connect time.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Address the session is connected to.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true once [`DeviceSession::disconnect`] has run.
    pub fn is_disconnected(&self) -> bool {
        self.state == SessionState::Disconnected
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_disconnected() {
            return Err(SessionError::Disconnected);
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = %self.state, to = %next, "Session state change");
        self.state = next;
    }

    async fn is_privileged(&mut self) -> SessionResult<bool> {
        let prompt = self.channel.find_prompt().await?;
        Ok(self.device_type.is_privileged_prompt(&prompt))
    }

    /// Makes sure the session is in privileged mode, asking the operator
    /// before escalating.
    ///
    /// Returns whether the session ended up privileged. Failing to escalate
    /// is reported to the operator but is not an error.
    #[instrument(skip(self, operator), fields(hostname = %self.hostname))]
    pub async fn ensure_privileged(&mut self, operator: &mut dyn Operator) -> SessionResult<bool> {
        self.ensure_open()?;

        let mut privileged = self.is_privileged().await?;
        if privileged {
            operator.say("Enable mode verified");
        } else {
            let consent = match operator.ask(ENABLE_CONSENT_PROMPT) {
                Ok(answer) => parse_yes_no(&answer) == Some(true),
                Err(e) => {
                    warn!(error = %e, "No answer to enable prompt");
                    false
                }
            };
            if consent {
                match self.escalate().await {
                    Ok(true) => {
                        privileged = true;
                        operator.say("Enable mode verified");
                    }
                    Ok(false) => {
                        warn!("Privilege escalation failed");
                        operator.say("Unable to enter enable mode.");
                    }
                    Err(e) => {
                        warn!(error = %e, "Privilege escalation failed");
                        operator.say("Unable to enter enable mode.");
                    }
                }
            }
        }

        self.transition(SessionState::PrivilegeChecked);
        Ok(privileged)
    }

    async fn escalate(&mut self) -> SessionResult<bool> {
        self.channel.enable(&self.secret).await?;
        self.is_privileged().await
    }

    /// Turns off output pagination so long tables arrive in one piece.
    pub async fn disable_paging(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        let command = self.device_type.paging_command();
        debug!(command = %command, "Sending command");
        self.channel.send_command(command).await?;
        self.transition(SessionState::Ready);
        Ok(())
    }

    /// Runs one exec-mode command and returns its output.
    pub async fn execute(&mut self, command: &str) -> SessionResult<String> {
        self.ensure_open()?;
        debug!(command = %command, "Sending command");
        self.channel.send_command(command).await
    }

    /// Runs `command` and waits for `token` to appear in the reply.
    pub async fn execute_and_expect(&mut self, command: &str, token: &str) -> SessionResult<String> {
        self.ensure_open()?;
        debug!(command = %command, expect = %token, "Sending command");
        self.channel.send_command_expect(command, token).await
    }

    /// Pushes `commands` through configuration mode and returns the
    /// combined output.
    #[instrument(skip(self, commands), fields(hostname = %self.hostname, count = commands.len()))]
    pub async fn execute_config_batch(&mut self, commands: &[String]) -> SessionResult<String> {
        self.ensure_open()?;
        for command in commands {
            debug!(command = %command, "Queued config command");
        }
        let output = self.channel.send_config_set(commands).await?;
        self.transition(SessionState::ConfigApplied);
        Ok(output)
    }

    /// Records that the last batch must not be saved.
    pub fn mark_config_failed(&mut self) {
        if !self.is_disconnected() {
            self.transition(SessionState::ConfigFailed);
        }
    }

    /// Copies the running configuration to startup.
    #[instrument(skip(self), fields(hostname = %self.hostname))]
    pub async fn save_config(&mut self) -> SessionResult<String> {
        self.ensure_open()?;
        if self.state == SessionState::ConfigFailed {
            warn!("Refusing to save a configuration that failed to apply");
            return Err(SessionError::transport(
                SAVE_CONFIG_CMD,
                "last configuration batch failed",
            ));
        }
        let output = self
            .execute_and_expect(SAVE_CONFIG_CMD, SAVE_COMPLETE_TOKEN)
            .await?;
        self.transition(SessionState::Saved);
        Ok(output)
    }

    /// Releases the transport.
    ///
    /// The session is `Disconnected` afterwards even if closing failed; a
    /// second call returns [`SessionError::Disconnected`].
    #[instrument(skip(self), fields(hostname = %self.hostname))]
    pub async fn disconnect(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.transition(SessionState::Disconnected);
        self.channel.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vlanswap_test::{credentials, ChannelCall, FakeConnector, FakeDevice, ScriptedOperator};

    async fn open(device: FakeDevice) -> (DeviceSession<vlanswap_test::FakeChannel>, FakeConnector) {
        let connector = FakeConnector::new(device);
        let session = DeviceSession::connect(&connector, &credentials())
            .await
            .unwrap();
        (session, connector)
    }

    #[tokio::test]
    async fn test_connect_reads_hostname() {
        let (session, _connector) = open(FakeDevice::new("access-sw1")).await;
        assert_eq!(session.hostname(), "access-sw1");
        assert_eq!(session.address(), credentials().address);
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let connector = FakeConnector::new(FakeDevice::new("access-sw1").unreachable());
        let result = DeviceSession::connect(&connector, &credentials()).await;
        assert!(matches!(result, Err(SessionError::Connect { .. })));
        assert_eq!(connector.log().close_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_closes_channel_when_prompt_missing() {
        let connector = FakeConnector::new(FakeDevice::new("access-sw1").without_prompt());
        let result = DeviceSession::connect(&connector, &credentials()).await;
        assert!(matches!(result, Err(SessionError::Timeout { .. })));
        assert_eq!(connector.log().close_count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_privileged_already_enabled() {
        let (mut session, connector) = open(FakeDevice::new("access-sw1")).await;
        let mut operator = ScriptedOperator::new(Vec::<String>::new());

        assert!(session.ensure_privileged(&mut operator).await.unwrap());
        assert!(operator.said("Enable mode verified"));
        assert!(operator.prompts().is_empty());
        assert_eq!(session.state(), SessionState::PrivilegeChecked);
        assert!(!connector
            .log()
            .calls()
            .iter()
            .any(|call| matches!(call, ChannelCall::Enable { .. })));
    }

    #[tokio::test]
    async fn test_ensure_privileged_escalates_with_login_password() {
        let device = FakeDevice::new("access-sw1")
            .unprivileged()
            .with_enable_secret(vlanswap_test::PASSWORD);
        let (mut session, connector) = open(device).await;
        let mut operator = ScriptedOperator::new(["y"]);

        assert!(session.ensure_privileged(&mut operator).await.unwrap());
        assert!(operator.said("Enable mode verified"));
        assert!(connector.log().calls().contains(&ChannelCall::Enable {
            secret: vlanswap_test::PASSWORD.to_string()
        }));
    }

    #[tokio::test]
    async fn test_ensure_privileged_wrong_secret() {
        let device = FakeDevice::new("access-sw1")
            .unprivileged()
            .with_enable_secret("something-else");
        let (mut session, _connector) = open(device).await;
        let mut operator = ScriptedOperator::new(["Y"]);

        assert!(!session.ensure_privileged(&mut operator).await.unwrap());
        assert!(operator.said("Unable to enter enable mode."));
        assert_eq!(session.state(), SessionState::PrivilegeChecked);
    }

    #[tokio::test]
    async fn test_ensure_privileged_survives_enable_timeout() {
        let device = FakeDevice::new("access-sw1")
            .unprivileged()
            .failing_on("enable");
        let (mut session, connector) = open(device).await;
        let mut operator = ScriptedOperator::new(["y"]);

        assert!(!session.ensure_privileged(&mut operator).await.unwrap());
        assert!(operator.said("Unable to enter enable mode."));
        assert_eq!(session.state(), SessionState::PrivilegeChecked);
        assert!(connector
            .log()
            .calls()
            .iter()
            .any(|call| matches!(call, ChannelCall::Enable { .. })));
    }

    #[tokio::test]
    async fn test_ensure_privileged_declined() {
        let (mut session, connector) = open(FakeDevice::new("access-sw1").unprivileged()).await;
        let mut operator = ScriptedOperator::new(["n"]);

        assert!(!session.ensure_privileged(&mut operator).await.unwrap());
        assert!(!operator.said("Unable to enter enable mode."));
        assert!(!connector
            .log()
            .calls()
            .iter()
            .any(|call| matches!(call, ChannelCall::Enable { .. })));
    }

    #[tokio::test]
    async fn test_disable_paging() {
        let (mut session, connector) = open(FakeDevice::new("access-sw1")).await;
        session.disable_paging().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(connector.log().commands(), vec!["terminal length 0"]);
    }

    #[tokio::test]
    async fn test_config_batch_and_save() {
        let (mut session, connector) = open(FakeDevice::new("access-sw1")).await;
        let batch = vec![
            "interface Gi1/0/1".to_string(),
            "switchport access vlan 20".to_string(),
        ];

        session.execute_config_batch(&batch).await.unwrap();
        assert_eq!(session.state(), SessionState::ConfigApplied);

        let output = session.save_config().await.unwrap();
        assert!(output.contains("[OK]"));
        assert_eq!(session.state(), SessionState::Saved);
        assert_eq!(connector.log().config_sets(), vec![batch]);
        assert_eq!(connector.log().commands(), vec!["write memory"]);
    }

    #[tokio::test]
    async fn test_save_refused_after_failed_batch() {
        let (mut session, connector) = open(FakeDevice::new("access-sw1")).await;
        session.mark_config_failed();
        assert!(session.save_config().await.is_err());
        assert!(connector.log().commands().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_is_terminal() {
        let (mut session, connector) = open(FakeDevice::new("access-sw1")).await;

        session.disconnect().await.unwrap();
        assert!(session.is_disconnected());

        assert!(matches!(
            session.disconnect().await,
            Err(SessionError::Disconnected)
        ));
        assert!(matches!(
            session.execute("show version").await,
            Err(SessionError::Disconnected)
        ));
        assert!(matches!(
            session.execute_config_batch(&[]).await,
            Err(SessionError::Disconnected)
        ));
        assert_eq!(connector.log().close_count(), 1);
    }
}
