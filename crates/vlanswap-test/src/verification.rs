//! Verification helpers for recorded device traffic
//!
//! Provides assertion helpers over a [`CallLog`]

use thiserror::Error;

use crate::fake::CallLog;

const SAVE_COMMAND: &str = "write memory";

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected {expected} disconnect(s), found {actual}")]
    DisconnectCount { expected: usize, actual: usize },

    #[error("Expected no configuration, found {count} batch(es)")]
    UnexpectedConfig { count: usize },

    #[error("Configuration mismatch: expected {expected:?}, got {actual:?}")]
    ConfigMismatch {
        expected: Vec<Vec<String>>,
        actual: Vec<Vec<String>>,
    },

    #[error("Command '{command}' was sent but should not have been")]
    UnexpectedCommand { command: String },

    #[error("Command '{command}' was never sent")]
    MissingCommand { command: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Call log verification helper
pub struct CallLogVerifier<'a> {
    log: &'a CallLog,
}

impl<'a> CallLogVerifier<'a> {
    /// Create a new verifier over `log`
    pub fn new(log: &'a CallLog) -> Self {
        Self { log }
    }

    /// Verify the channel was closed exactly once
    pub fn assert_disconnected_once(&self) -> VerifyResult<()> {
        let actual = self.log.close_count();
        if actual != 1 {
            return Err(VerificationError::DisconnectCount {
                expected: 1,
                actual,
            });
        }
        Ok(())
    }

    /// Verify nothing was ever connected, so nothing needed closing
    pub fn assert_never_connected(&self) -> VerifyResult<()> {
        let actual = self.log.close_count();
        if actual != 0 {
            return Err(VerificationError::DisconnectCount {
                expected: 0,
                actual,
            });
        }
        Ok(())
    }

    /// Verify no configuration batch was sent
    pub fn assert_no_config_sent(&self) -> VerifyResult<()> {
        let count = self.log.config_sets().len();
        if count != 0 {
            return Err(VerificationError::UnexpectedConfig { count });
        }
        Ok(())
    }

    /// Verify exactly one batch was sent and it equals `expected`
    pub fn assert_config_sent(&self, expected: &[&str]) -> VerifyResult<()> {
        let expected = vec![expected.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
        let actual = self.log.config_sets();
        if actual != expected {
            return Err(VerificationError::ConfigMismatch { expected, actual });
        }
        Ok(())
    }

    /// Verify `command` was sent
    pub fn assert_command_sent(&self, command: &str) -> VerifyResult<()> {
        if !self.log.commands().iter().any(|c| c == command) {
            return Err(VerificationError::MissingCommand {
                command: command.to_string(),
            });
        }
        Ok(())
    }

    /// Verify the configuration was saved
    pub fn assert_saved(&self) -> VerifyResult<()> {
        self.assert_command_sent(SAVE_COMMAND)
    }

    /// Verify the configuration was not saved
    pub fn assert_not_saved(&self) -> VerifyResult<()> {
        if self.log.commands().iter().any(|c| c == SAVE_COMMAND) {
            return Err(VerificationError::UnexpectedCommand {
                command: SAVE_COMMAND.to_string(),
            });
        }
        Ok(())
    }
}
