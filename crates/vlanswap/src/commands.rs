//! IOS command builders for VLAN reassignment

use crate::types::VlanId;

/// Exec command that lists every port with its status and access VLAN.
pub const SHOW_INTERFACES_STATUS_CMD: &str = "show interfaces status";

/// Exec command that copies the running configuration to startup.
pub const SAVE_CONFIG_CMD: &str = "write memory";

/// Printed by the device once the configuration has been written.
pub const SAVE_COMPLETE_TOKEN: &str = "[OK]";

/// Build the command that selects an interface in configuration mode
pub fn build_select_interface_cmd(interface: &str) -> String {
    format!("interface {}", interface)
}

/// Build the command that sets a port's access VLAN
pub fn build_access_vlan_cmd(vlan: &VlanId) -> String {
    format!("switchport access vlan {}", vlan)
}

/// Ordered configuration commands for one reassignment.
///
/// Holds one `interface` / `switchport access vlan` pair per target, in
/// target order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandBatch(Vec<String>);

impl CommandBatch {
    /// Builds the batch that moves every interface in `targets` to `destination`.
    pub fn reassign<S: AsRef<str>>(targets: &[S], destination: &VlanId) -> Self {
        let set_vlan = build_access_vlan_cmd(destination);
        let commands = targets
            .iter()
            .flat_map(|target| {
                [
                    build_select_interface_cmd(target.as_ref()),
                    set_vlan.clone(),
                ]
            })
            .collect();
        Self(commands)
    }

    /// Number of commands in the batch.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the batch has no commands.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The commands in send order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_select_interface_cmd() {
        assert_eq!(build_select_interface_cmd("Gi1/0/1"), "interface Gi1/0/1");
    }

    #[test]
    fn test_build_access_vlan_cmd() {
        let vlan: VlanId = "99".parse().unwrap();
        assert_eq!(build_access_vlan_cmd(&vlan), "switchport access vlan 99");
    }

    #[test]
    fn test_batch_single_target() {
        let vlan: VlanId = "99".parse().unwrap();
        let batch = CommandBatch::reassign(&["Gi1/0/1"], &vlan);
        assert_eq!(
            batch.as_slice(),
            &["interface Gi1/0/1", "switchport access vlan 99"]
        );
    }

    #[test]
    fn test_batch_interleaves_in_target_order() {
        let vlan: VlanId = "300".parse().unwrap();
        let targets = ["Gi1/0/7", "Gi1/0/2", "Fa0/3"];
        let batch = CommandBatch::reassign(&targets, &vlan);

        assert_eq!(batch.len(), 2 * targets.len());
        assert_eq!(
            batch.as_slice(),
            &[
                "interface Gi1/0/7",
                "switchport access vlan 300",
                "interface Gi1/0/2",
                "switchport access vlan 300",
                "interface Fa0/3",
                "switchport access vlan 300",
            ]
        );
    }

    #[test]
    fn test_batch_keeps_destination_token() {
        let vlan: VlanId = "0042".parse().unwrap();
        let batch = CommandBatch::reassign(&["Gi1/0/1"], &vlan);
        assert_eq!(batch.as_slice()[1], "switchport access vlan 0042");
    }

    #[test]
    fn test_batch_empty_targets() {
        let vlan: VlanId = "5".parse().unwrap();
        let batch = CommandBatch::reassign::<&str>(&[], &vlan);
        assert!(batch.is_empty());
    }
}
