//! SshConnector and SshChannel against a switch on loopback
//!
//! A small russh server plays a Cisco IOS access switch: it prints a prompt
//! as soon as the shell starts, echoes every line it receives and answers
//! the commands vlanswap sends with IOS-shaped output.

use pretty_assertions::assert_eq;
use russh::keys::PrivateKey;
use russh::server::{run_stream, Auth, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use vlanswap_common::{
    CommandChannel, Connector, DeviceCredentials, SessionError, SessionResult, SshChannel,
    SshConnector,
};

const HOSTNAME: &str = "sw1";
const USERNAME: &str = "netops";
const PASSWORD: &str = "s3cret";
const ENABLE_SECRET: &str = "en4ble";

const STATUS_TABLE: &str = "\
Port      Name               Status       Vlan       Duplex  Speed Type
Gi1/0/1                      connected    10           full   1000 10/100/1000BaseTX
Gi1/0/2   lab connected 10 x connected    20         a-full a-1000 10/100/1000BaseTX";

const INVALID_INPUT: &str = "                    ^\r\n% Invalid input detected at '^' marker.\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    User,
    Privileged,
    Config,
    ConfigIf,
    /// Waiting for the enable secret after `attempts` wrong answers
    Secret { attempts: u8 },
}

/// What the switch sends for one input line.
struct Reply {
    now: String,
    later: Option<String>,
}

impl Reply {
    fn now(text: String) -> Self {
        Self {
            now: text,
            later: None,
        }
    }
}

/// Per-connection state of the loopback switch.
struct Switch {
    mode: Mode,
    pending: Vec<u8>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl Switch {
    fn prompt(&self) -> String {
        match self.mode {
            Mode::User => format!("{}>", HOSTNAME),
            Mode::Privileged | Mode::Secret { .. } => format!("{}#", HOSTNAME),
            Mode::Config => format!("{}(config)#", HOSTNAME),
            Mode::ConfigIf => format!("{}(config-if)#", HOSTNAME),
        }
    }

    fn answer(&mut self, line: &str) -> Reply {
        if let Mode::Secret { attempts } = self.mode {
            // Secrets are not echoed.
            if line == ENABLE_SECRET {
                self.mode = Mode::Privileged;
                return Reply::now(format!("\r\n{}", self.prompt()));
            }
            if attempts >= 2 {
                self.mode = Mode::User;
                return Reply::now(format!("\r\n% Bad secrets\r\n\r\n{}", self.prompt()));
            }
            self.mode = Mode::Secret {
                attempts: attempts + 1,
            };
            return Reply::now("\r\nPassword: ".to_string());
        }

        let output = match (self.mode, line) {
            (_, "") => String::new(),
            (Mode::User, "enable") => {
                self.mode = Mode::Secret { attempts: 0 };
                return Reply::now(format!("{}\r\nPassword: ", line));
            }
            (Mode::User | Mode::Privileged, "terminal length 0") => String::new(),
            (Mode::User | Mode::Privileged, "show interfaces status") => {
                format!("{}\r\n", STATUS_TABLE.replace('\n', "\r\n"))
            }
            (Mode::Privileged, "configure terminal") => {
                self.mode = Mode::Config;
                "Enter configuration commands, one per line.  End with CNTL/Z.\r\n".to_string()
            }
            (Mode::Privileged, "write memory") => {
                return Reply {
                    now: format!("{}\r\nBuilding configuration...\r\n", line),
                    later: Some(format!("[OK]\r\n{}", self.prompt())),
                };
            }
            (Mode::Config | Mode::ConfigIf, command) if command.starts_with("interface ") => {
                self.mode = Mode::ConfigIf;
                String::new()
            }
            (Mode::ConfigIf, command) if command.starts_with("switchport access vlan ") => {
                String::new()
            }
            (Mode::Config | Mode::ConfigIf, "end") => {
                self.mode = Mode::Privileged;
                String::new()
            }
            _ => INVALID_INPUT.to_string(),
        };
        Reply::now(format!("{}\r\n{}{}", line, output, self.prompt()))
    }
}

impl russh::server::Handler for Switch {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if user == USERNAME && password == PASSWORD {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject {
                proceed_with_methods: None,
                partial_success: false,
            })
        }
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        session.data(channel, CryptoVec::from(format!("\r\n{}", self.prompt())))
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        for &byte in data {
            match byte {
                b'\r' => {}
                b'\n' => {
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    self.pending.clear();
                    self.lines.lock().expect("line log poisoned").push(line.clone());

                    let reply = self.answer(&line);
                    session.data(channel, CryptoVec::from(reply.now))?;
                    if let Some(later) = reply.later {
                        let handle = session.handle();
                        tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            let _ = handle.data(channel, CryptoVec::from(later)).await;
                        });
                    }
                }
                _ => self.pending.push(byte),
            }
        }
        Ok(())
    }
}

/// A switch listening on a loopback port for a single connection.
struct LoopbackSwitch {
    port: u16,
    lines: Arc<Mutex<Vec<String>>>,
}

impl LoopbackSwitch {
    async fn start(mode: Mode) -> Self {
        let key_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/switch_host_ed25519");
        let host_key = PrivateKey::read_openssh_file(&key_path).expect("read host key");
        let config = Arc::new(russh::server::Config {
            keys: vec![host_key],
            auth_rejection_time: Duration::from_millis(10),
            nodelay: true,
            ..Default::default()
        });

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind loopback");
        let port = listener.local_addr().expect("local address").port();
        let lines = Arc::new(Mutex::new(Vec::new()));

        let switch = Switch {
            mode,
            pending: Vec::new(),
            lines: lines.clone(),
        };
        tokio::spawn(async move {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let Ok(session) = run_stream(config, socket, switch).await else {
                return;
            };
            let _ = session.await;
        });

        Self { port, lines }
    }

    /// Every line the switch received, in order
    fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("line log poisoned").clone()
    }

    async fn connect(&self, password: &str) -> SessionResult<SshChannel> {
        let credentials =
            DeviceCredentials::new(Ipv4Addr::LOCALHOST, USERNAME, password).with_port(self.port);
        SshConnector::new(Duration::from_secs(5))
            .connect(&credentials)
            .await
    }
}

#[tokio::test]
async fn test_commands_read_their_own_output() {
    let switch = LoopbackSwitch::start(Mode::Privileged).await;
    let mut channel = switch.connect(PASSWORD).await.unwrap();

    assert_eq!(channel.find_prompt().await.unwrap(), "sw1#");
    assert_eq!(channel.send_command("terminal length 0").await.unwrap(), "");
    assert_eq!(
        channel.send_command("show interfaces status").await.unwrap(),
        STATUS_TABLE
    );

    channel.close().await.unwrap();
    assert_eq!(
        switch.lines(),
        vec!["", "terminal length 0", "show interfaces status"]
    );
}

#[tokio::test]
async fn test_config_batch_and_save() {
    let switch = LoopbackSwitch::start(Mode::Privileged).await;
    let mut channel = switch.connect(PASSWORD).await.unwrap();
    channel.find_prompt().await.unwrap();

    let commands = vec![
        "interface Gi1/0/1".to_string(),
        "switchport access vlan 99".to_string(),
    ];
    let transcript = channel.send_config_set(&commands).await.unwrap();
    assert!(transcript.contains("sw1(config-if)#"));
    assert!(!transcript.contains('%'));

    let saved = channel
        .send_command_expect("write memory", "[OK]")
        .await
        .unwrap();
    assert_eq!(saved, "Building configuration...\n[OK]");
    assert_eq!(channel.find_prompt().await.unwrap(), "sw1#");

    channel.close().await.unwrap();
    assert_eq!(
        switch.lines(),
        vec![
            "",
            "configure terminal",
            "interface Gi1/0/1",
            "switchport access vlan 99",
            "end",
            "write memory",
            "",
        ]
    );
}

#[tokio::test]
async fn test_config_error_is_in_transcript() {
    let switch = LoopbackSwitch::start(Mode::Privileged).await;
    let mut channel = switch.connect(PASSWORD).await.unwrap();
    channel.find_prompt().await.unwrap();

    let commands = vec![
        "interface Gi1/0/1".to_string(),
        "switchport acess vlan 99".to_string(),
    ];
    let transcript = channel.send_config_set(&commands).await.unwrap();
    assert!(transcript.contains("% Invalid input detected at '^' marker."));

    // The batch still leaves config mode.
    assert_eq!(channel.find_prompt().await.unwrap(), "sw1#");
    channel.close().await.unwrap();
}

#[tokio::test]
async fn test_enable_answers_password_challenge() {
    let switch = LoopbackSwitch::start(Mode::User).await;
    let mut channel = switch.connect(PASSWORD).await.unwrap();
    assert_eq!(channel.find_prompt().await.unwrap(), "sw1>");

    channel.enable(ENABLE_SECRET).await.unwrap();
    assert_eq!(channel.find_prompt().await.unwrap(), "sw1#");
    assert_eq!(
        channel.send_command("terminal length 0").await.unwrap(),
        ""
    );

    channel.close().await.unwrap();
    assert_eq!(
        switch.lines(),
        vec!["", "enable", ENABLE_SECRET, "", "terminal length 0"]
    );
}

#[tokio::test]
async fn test_enable_with_wrong_secret_stays_unprivileged() {
    let switch = LoopbackSwitch::start(Mode::User).await;
    let mut channel = switch.connect(PASSWORD).await.unwrap();
    channel.find_prompt().await.unwrap();

    channel.enable("wrong").await.unwrap();
    assert_eq!(channel.find_prompt().await.unwrap(), "sw1>");

    channel.close().await.unwrap();
    assert_eq!(
        switch.lines(),
        vec!["", "enable", "wrong", "", "", ""]
    );
}

#[tokio::test]
async fn test_rejected_login() {
    let switch = LoopbackSwitch::start(Mode::Privileged).await;

    let result = switch.connect("not-the-password").await;

    assert!(matches!(result, Err(SessionError::Auth { .. })));
}
