//! Error types for the Art-Net bridge

use thiserror::Error;

use crate::dmx::BusId;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Routing error: {0}")]
    Route(#[from] RouteError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors, all fatal at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Net {0} out of range (0-127)")]
    NetOutOfRange(u8),

    #[error("Subnet {0} out of range (0-15)")]
    SubnetOutOfRange(u8),

    #[error("Universe {0} out of range (0-15)")]
    UniverseOutOfRange(u8),

    #[error("Channel {0} out of range (1-512)")]
    ChannelOutOfRange(u16),

    #[error("Duplicate channel name: {0}")]
    DuplicateChannelName(String),

    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Route table construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("DMX bus {0} already has a route")]
    DuplicateRoute(BusId),

    #[error("Route universe {0} out of range (0-15)")]
    UniverseOutOfRange(u8),
}

/// Art-Net wire format errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Packet too short: {0} bytes")]
    TooShort(usize),

    #[error("Invalid Art-Net identifier")]
    InvalidIdentifier,

    #[error("Unsupported opcode: {0:#06x}")]
    UnsupportedOpcode(u16),

    #[error("DMX length too large: {0}")]
    LengthTooLarge(u16),

    #[error("Truncated frame: declared {declared} bytes, got {available}")]
    Truncated { declared: u16, available: usize },
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
