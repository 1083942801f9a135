//! Test fixtures for device sessions
//!
//! Provides credentials and `show interfaces status` samples

use std::net::Ipv4Addr;

use vlanswap_common::DeviceCredentials;

/// Login name used by the fixtures.
pub const USERNAME: &str = "netops";

/// Login password used by the fixtures; also the enable secret.
pub const PASSWORD: &str = "s3cret";

/// Address of the fixture switch.
pub const DEVICE_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 20, 0, 5);

/// Hostname shown in the fixture switch prompt.
pub const DEVICE_HOSTNAME: &str = "access-sw1";

/// Credentials for the fixture switch
pub fn credentials() -> DeviceCredentials {
    DeviceCredentials::new(DEVICE_ADDRESS, USERNAME, PASSWORD)
}

/// One `show interfaces status` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// Interface name
    pub port: String,
    /// Description
    pub name: String,
    /// Status column
    pub status: String,
    /// VLAN column
    pub vlan: String,
    /// Duplex column
    pub duplex: String,
    /// Speed column
    pub speed: String,
    /// Type column
    pub media_type: String,
}

impl StatusRow {
    /// A connected copper access port in `vlan` with no description
    pub fn access(port: impl Into<String>, vlan: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            name: String::new(),
            status: "connected".to_string(),
            vlan: vlan.into(),
            duplex: "a-full".to_string(),
            speed: "a-1000".to_string(),
            media_type: "10/100/1000BaseTX".to_string(),
        }
    }

    /// Set the description
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the status column
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Set the duplex and speed columns
    pub fn with_link(mut self, duplex: impl Into<String>, speed: impl Into<String>) -> Self {
        self.duplex = duplex.into();
        self.speed = speed.into();
        self
    }

    /// Render the row in IOS column layout
    pub fn render(&self) -> String {
        format!(
            "{:<9} {:<18} {:<12} {:<10} {:>6} {:>6} {}",
            self.port, self.name, self.status, self.vlan, self.duplex, self.speed, self.media_type
        )
    }
}

/// Header line of `show interfaces status`
pub const STATUS_HEADER: &str =
    "Port      Name               Status       Vlan       Duplex  Speed Type";

/// Render a full status table, header first
pub fn status_output(rows: &[StatusRow]) -> String {
    let mut out = String::from(STATUS_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&row.render());
        out.push('\n');
    }
    out
}

/// Common `show interfaces status` samples
pub mod status_fixtures {
    use super::*;

    /// Two access ports: Gi1/0/1 in VLAN 10 and Gi1/0/2 in VLAN 20
    pub fn two_port_switch() -> String {
        status_output(&[
            StatusRow::access("Gi1/0/1", "10").with_link("full", "1000"),
            StatusRow::access("Gi1/0/2", "20").with_link("full", "1000"),
        ])
    }

    /// A mixed access layer switch: several ports in VLAN 10, a trunk
    /// uplink and a routed port
    pub fn access_switch() -> String {
        status_output(&[
            StatusRow::access("Gi1/0/1", "10").with_name("Printer 2F"),
            StatusRow::access("Gi1/0/2", "20"),
            StatusRow::access("Gi1/0/3", "10")
                .with_name("lab bench")
                .with_status("notconnect"),
            StatusRow::access("Gi1/0/4", "10").with_status("err-disabled"),
            StatusRow {
                port: "Te1/1/1".to_string(),
                name: "uplink core-1".to_string(),
                status: "connected".to_string(),
                vlan: "trunk".to_string(),
                duplex: "full".to_string(),
                speed: "10G".to_string(),
                media_type: "SFP-10GBase-SR".to_string(),
            },
            StatusRow::access("Gi1/0/5", "routed").with_name("fw outside"),
        ])
    }

    /// Reply of a device that does not know the command
    pub fn invalid_input() -> String {
        "show interfaces status\n                ^\n% Invalid input detected at '^' marker.\n"
            .to_string()
    }
}
