//! Test infrastructure for vlanswap
//!
//! Provides:
//! - Status output and credential fixtures
//! - A recording fake device channel and connector
//! - A fake name resolver
//! - A scripted operator that replays answers and records status lines
//! - Call log verification helpers

pub mod fake;
pub mod fixtures;
mod operator;
mod verification;

pub use fake::{CallLog, ChannelCall, FakeChannel, FakeConnector, FakeDevice, FakeResolver};
pub use fixtures::*;
pub use operator::ScriptedOperator;
pub use verification::*;
