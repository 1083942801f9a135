//! Type definitions for vlanswap

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowest VLAN number the operator may enter.
pub const VLAN_MIN: u32 = 1;

/// Highest VLAN number the operator may enter.
pub const VLAN_MAX: u32 = 4096;

/// Returns true if `token` is all ASCII digits and names a VLAN in
/// [`VLAN_MIN`]..=[`VLAN_MAX`].
pub fn is_valid_vlan(token: &str) -> bool {
    !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && token
            .parse::<u32>()
            .is_ok_and(|n| (VLAN_MIN..=VLAN_MAX).contains(&n))
}

/// Rejected VLAN input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a VLAN ID (1-4096)")]
pub struct InvalidVlanId(pub String);

/// A VLAN ID exactly as the operator typed it.
///
/// The token is kept verbatim (leading zeros included) because it is
/// compared textually against the VLAN column the device reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VlanId(String);

impl VlanId {
    /// Returns the token as typed.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric VLAN.
    pub fn number(&self) -> u16 {
        // Validated on construction: digits only and at most 4096.
        self.0.parse().unwrap_or_default()
    }
}

impl FromStr for VlanId {
    type Err = InvalidVlanId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if is_valid_vlan(token) {
            Ok(VlanId(token.to_string()))
        } else {
            Err(InvalidVlanId(s.to_string()))
        }
    }
}

impl TryFrom<String> for VlanId {
    type Error = InvalidVlanId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VlanId> for String {
    fn from(vlan: VlanId) -> String {
        vlan.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The VLAN being emptied and the VLAN its ports move to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanPair {
    /// VLAN whose access ports are reassigned.
    pub source: VlanId,
    /// VLAN the ports are moved into.
    pub destination: VlanId,
}

impl VlanPair {
    /// Creates a new VlanPair
    pub fn new(source: VlanId, destination: VlanId) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// One row of `show interfaces status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// Interface name in device notation (e.g. `Gi1/0/1`)
    pub name: String,
    /// Port description, possibly empty
    pub description: String,
    /// Link/admin status as reported
    pub status: String,
    /// Access VLAN, or a marker such as `trunk` or `routed`
    pub vlan: String,
    /// Duplex
    pub duplex: String,
    /// Speed
    pub speed: String,
    /// Media type
    pub media_type: String,
}

impl InterfaceRecord {
    /// Number of fields in a status row.
    pub const FIELD_COUNT: usize = 7;

    /// Builds a record from a status row in column order; `None` unless the
    /// row has exactly [`Self::FIELD_COUNT`] fields.
    pub fn from_row(row: Vec<String>) -> Option<Self> {
        let [name, description, status, vlan, duplex, speed, media_type]: [String; 7] =
            row.try_into().ok()?;
        Some(Self {
            name,
            // Fixed-width columns keep their padding.
            description: description.trim_end().to_string(),
            status,
            vlan,
            duplex,
            speed,
            media_type,
        })
    }

    /// Returns true if the port sits in `vlan` as an access port.
    pub fn is_in_vlan(&self, vlan: &VlanId) -> bool {
        self.vlan == vlan.as_str()
    }
}

/// How a reassignment attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassignOutcome {
    /// Changes applied and saved.
    Applied,
    /// No interface was in the source VLAN.
    NoMatch,
    /// The operator declined the change.
    Declined,
    /// The device reported a problem; the running config was left unsaved.
    Failed {
        /// Device output that triggered the failure.
        output: String,
    },
}

impl ReassignOutcome {
    /// Short outcome name for logs.
    pub fn as_str(&self) -> &str {
        match self {
            ReassignOutcome::Applied => "applied",
            ReassignOutcome::NoMatch => "no_match",
            ReassignOutcome::Declined => "declined",
            ReassignOutcome::Failed { .. } => "failed",
        }
    }
}

/// How a whole workflow run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The operator exited at the VLAN prompt.
    Cancelled,
    /// The device name did not resolve.
    Unresolved,
    /// The device could not be reached or refused the login.
    ConnectFailed,
    /// The interface status could not be retrieved or understood.
    StatusUnavailable,
    /// The reassignment engine ran.
    Reassign(ReassignOutcome),
}
