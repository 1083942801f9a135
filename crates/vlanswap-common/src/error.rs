//! Error types for device sessions and table templates.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use thiserror::Error;

/// Result type alias for device session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type alias for template compilation and parsing.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised by a device command channel or the session wrapped around it.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport could not be opened.
    #[error("Failed to connect to {address}: {message}")]
    Connect {
        /// The device address.
        address: String,
        /// Transport error message.
        message: String,
    },

    /// The device rejected every authentication attempt.
    #[error("Authentication failed for '{username}' at {address}")]
    Auth {
        /// The device address.
        address: String,
        /// The login name that was refused.
        username: String,
    },

    /// The transport failed after the session was established.
    #[error("Transport error during {operation}: {message}")]
    Transport {
        /// The operation that failed (e.g., "send", "open channel").
        operation: String,
        /// Error message.
        message: String,
    },

    /// The device did not produce the expected prompt or token in time.
    #[error("Timed out after {seconds}s waiting for {waiting_for}")]
    Timeout {
        /// What the reader was waiting for.
        waiting_for: String,
        /// The read timeout that elapsed.
        seconds: u64,
    },

    /// The device closed the channel while output was still expected.
    #[error("Channel closed by device while waiting for {waiting_for}")]
    ChannelClosed {
        /// What the reader was waiting for.
        waiting_for: String,
    },

    /// An operation was attempted after the session was torn down.
    #[error("Device session is already disconnected")]
    Disconnected,
}

impl SessionError {
    /// Creates a connect error.
    pub fn connect(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    pub fn auth(address: impl Into<String>, username: impl Into<String>) -> Self {
        Self::Auth {
            address: address.into(),
            username: username.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(waiting_for: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            waiting_for: waiting_for.into(),
            seconds,
        }
    }

    /// Creates a channel closed error.
    pub fn channel_closed(waiting_for: impl Into<String>) -> Self {
        Self::ChannelClosed {
            waiting_for: waiting_for.into(),
        }
    }

    /// Returns true if the error happened before a session existed,
    /// so there is nothing to disconnect.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, SessionError::Connect { .. } | SessionError::Auth { .. })
    }
}

/// Errors raised while compiling a template or running it over text.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A `Value` line could not be understood.
    #[error("Invalid value definition on line {line}: {message}")]
    InvalidValue {
        /// 1-based template line number.
        line: usize,
        /// Error message.
        message: String,
    },

    /// A value option that this parser does not implement.
    #[error("Unsupported value option '{option}' on line {line}")]
    UnsupportedOption {
        /// 1-based template line number.
        line: usize,
        /// The option name.
        option: String,
    },

    /// A rule line could not be understood.
    #[error("Invalid rule on line {line}: {message}")]
    InvalidRule {
        /// 1-based template line number.
        line: usize,
        /// Error message.
        message: String,
    },

    /// A rule regex failed to compile after value substitution.
    #[error("Invalid regex on line {line}: {source}")]
    Regex {
        /// 1-based template line number.
        line: usize,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// A rule references a state that is never defined.
    #[error("Rule on line {line} transitions to undefined state '{state}'")]
    UndefinedState {
        /// 1-based template line number.
        line: usize,
        /// The missing state name.
        state: String,
    },

    /// The template has no `Start` state.
    #[error("Template has no Start state")]
    MissingStart,

    /// An `Error` action fired while parsing input.
    #[error("Template rejected input line {line}: {text}")]
    Rejected {
        /// 1-based input line number.
        line: usize,
        /// The rejected input line.
        text: String,
    },
}

impl TemplateError {
    /// Creates an invalid value error.
    pub fn invalid_value(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            line,
            message: message.into(),
        }
    }

    /// Creates an invalid rule error.
    pub fn invalid_rule(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            line,
            message: message.into(),
        }
    }
}
