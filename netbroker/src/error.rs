//! Error types for netbroker.
//!
//! Errors are split by scope. [`InputError`] is batch-level and fatal before
//! dispatch starts. [`ResolutionError`] and [`DeviceError`] are device-scoped:
//! they end up inside that device's outcome and never cross to another device.

use std::io;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Main error type for batch-level operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid invocation or inventory input
    #[error("{0}")]
    Input(#[from] InputError),

    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// I/O error while reading input or writing the report
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Batch-level input errors, detected before any device is contacted.
#[derive(Error, Debug)]
pub enum InputError {
    /// Input was not valid JSON
    #[error("Invalid JSON input - {0}")]
    Json(#[from] serde_json::Error),

    /// Input could not be read
    #[error("Failed to read input - {0}")]
    Read(#[source] io::Error),

    /// Nothing was provided to read an inventory from
    #[error("No input provided on stdin")]
    Empty,

    /// Top-level document has the wrong shape
    #[error(
        "Input must be a JSON array of devices or an object with an 'inventory_nodes' key"
    )]
    InvalidShape,

    /// Inventory contains no devices
    #[error("Device list is empty")]
    EmptyInventory,

    /// A node at `index` is malformed
    #[error("Device at index {index} {reason}")]
    InvalidNode { index: usize, reason: String },

    /// Two nodes share the same name
    #[error("Duplicate device name '{name}' in inventory")]
    DuplicateName { name: String },

    /// An invocation parameter is malformed
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Timeout connecting to {host}:{port} after {timeout:?}")]
    Timeout {
        host: String,
        port: u16,
        timeout: Duration,
    },
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// A prompt pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Privilege escalation did not reach a privileged prompt
    #[error("Failed to enter privileged mode, prompt is still '{prompt}'")]
    PrivilegeFailed { prompt: String },
}

/// Pre-flight failure while resolving a device's effective configuration.
///
/// Resolution never touches the network, so these are always reported
/// before a connection is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Username or credential (password / private key) is absent
    #[error("Missing required credential '{field}'")]
    MissingCredential { field: &'static str },

    /// Host attribute is absent
    #[error("Missing required parameter 'host'")]
    MissingHost,

    /// No platform / device type was supplied
    #[error("Missing required parameter 'device_type'")]
    UnknownPlatform,

    /// The operation has no command or change set to work with
    #[error("{operation} requires {parameter}")]
    MissingOperationParameter {
        operation: &'static str,
        parameter: &'static str,
    },

    /// An attribute has the wrong type or value
    #[error("Invalid attribute '{field}': {reason}")]
    InvalidAttribute { field: &'static str, reason: String },

    /// Merged driver options do not deserialize
    #[error("Invalid driver options: {0}")]
    InvalidOptions(String),

    /// Driver family name is not recognized
    #[error("Unknown driver '{0}' (expected one of: blocking, netmiko, async, scrapli)")]
    UnknownDriver(String),
}

/// Classification of a device-scoped failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ResolutionError,
    ConnectError,
    CommandError,
    CommitError,
    TimeoutError,
}

impl ErrorKind {
    /// Name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ResolutionError => "ResolutionError",
            ErrorKind::ConnectError => "ConnectError",
            ErrorKind::CommandError => "CommandError",
            ErrorKind::CommitError => "CommitError",
            ErrorKind::TimeoutError => "TimeoutError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, device-scoped error.
///
/// Session drivers return these directly so the dispatcher can build an
/// outcome without knowing which driver family produced the error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Session could not be established (timeout, auth, unreachable)
    #[error("{0}")]
    Connect(String),

    /// Device rejected or errored on a command or config transaction
    #[error("{0}")]
    Command(String),

    /// Commit failed after the changes were staged
    #[error("{0}")]
    Commit(String),

    /// Whole-device or batch deadline expired
    #[error("{0}")]
    Timeout(String),
}

impl DeviceError {
    /// Get the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeviceError::Resolution(_) => ErrorKind::ResolutionError,
            DeviceError::Connect(_) => ErrorKind::ConnectError,
            DeviceError::Command(_) => ErrorKind::CommandError,
            DeviceError::Commit(_) => ErrorKind::CommitError,
            DeviceError::Timeout(_) => ErrorKind::TimeoutError,
        }
    }

    /// Classify a lower-layer error raised while opening a session.
    pub fn connect(err: impl Into<Error>) -> Self {
        DeviceError::Connect(err.into().to_string())
    }

    /// Classify a lower-layer error raised while running commands.
    pub fn command(err: impl Into<Error>) -> Self {
        DeviceError::Command(err.into().to_string())
    }
}

/// Result type alias using netbroker's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_kind() {
        assert_eq!(
            DeviceError::from(ResolutionError::MissingHost).kind(),
            ErrorKind::ResolutionError
        );
        assert_eq!(
            DeviceError::Connect("x".into()).kind(),
            ErrorKind::ConnectError
        );
        assert_eq!(
            DeviceError::Commit("x".into()).kind(),
            ErrorKind::CommitError
        );
    }

    #[test]
    fn test_channel_timeout_classified_as_command() {
        let err = DeviceError::command(ChannelError::PatternTimeout(Duration::from_secs(5)));
        assert_eq!(err.kind(), ErrorKind::CommandError);
        assert_eq!(err.to_string(), "Channel error: Pattern not found within 5s");
    }

    #[test]
    fn test_input_error_messages() {
        let err = InputError::InvalidNode {
            index: 3,
            reason: "missing 'name' field".into(),
        };
        assert_eq!(err.to_string(), "Device at index 3 missing 'name' field");
        assert_eq!(
            ErrorKind::TimeoutError.to_string(),
            "TimeoutError"
        );
    }
}
