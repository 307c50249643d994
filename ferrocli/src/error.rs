//! Error types for ferrocli.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for ferrocli operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl Error {
    /// True when no prompt (or no data) arrived within the allowed window.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Channel(ChannelError::PatternTimeout(_))
                | Error::Transport(TransportError::Timeout(_))
        )
    }

    /// True when the remote end went away while an operation was running.
    pub fn is_connection_closed(&self) -> bool {
        matches!(
            self,
            Error::Channel(ChannelError::Closed) | Error::Transport(TransportError::Disconnected)
        )
    }
}

/// Transport layer errors (connection setup, authentication, raw I/O).
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

    /// Host is not present in known_hosts and strict checking is enabled
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Write or read attempted before `open()`
    #[error("Transport is not open")]
    NotOpen,

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Failed to request shell
    #[error("Failed to request shell")]
    ShellRequestFailed,

    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Session layer errors (lifecycle, command execution).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session never opened
    #[error("Session not connected - call open() first")]
    NotConnected,

    /// Session already open
    #[error("Session already connected")]
    AlreadyConnected,

    /// Session was closed, explicitly or after an unrecoverable fault
    #[error("Session is closed - call open() to reconnect")]
    Closed,

    /// Another caller is executing a command on this session
    #[error("Session is busy executing another command")]
    Busy,

    /// In-band login did not reach the prompt
    #[error("Authentication failed for user '{user}' after {attempts} attempt(s)")]
    AuthenticationFailed { user: String, attempts: u32 },

    /// Command output matched a failure pattern (strict mode only)
    #[error("Command '{command}' failed: output matched '{pattern}'")]
    CommandFailed { command: String, pattern: String },

    /// The device did not show the configuration prompt
    #[error("Failed to enter configuration mode with '{command}' (prompt: '{prompt}')")]
    ConfigModeFailed { command: String, prompt: String },

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// Platform name not present in the table
    #[error("Unknown platform '{name}'")]
    UnknownPlatform { name: String },

    /// Platform name registered twice
    #[error("Platform '{name}' is already registered")]
    AlreadyRegistered { name: String },
}

/// Result type alias using ferrocli's Error.
pub type Result<T> = std::result::Result<T, Error>;
