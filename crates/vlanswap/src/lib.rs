//! vlanswap - move every access port in one VLAN to another VLAN
//!
//! Connects to one Cisco IOS switch, reads `show interfaces status`, and
//! after operator confirmation moves each access port found in the source
//! VLAN to the destination VLAN. The running configuration is saved only
//! when the device reported no errors.

mod commands;
mod config;
mod reassign;
mod selector;
mod session;
mod tables;
mod types;
mod workflow;

pub use commands::*;
pub use config::*;
pub use reassign::{classify_apply_output, reassign, ApplyStatus};
pub use selector::*;
pub use session::*;
pub use tables::*;
pub use types::*;
pub use workflow::{resolve_device, Workflow};
