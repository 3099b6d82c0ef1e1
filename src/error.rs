//! Error types for the streaming core
//!
//! Nothing in here is fatal to the dashboard: protocol errors drop a single
//! frame, transport errors trigger a reconnect, and config/dashboard errors are
//! reported before any connection is made.

use std::fmt;

/// A frame that does not conform to the wire schema
#[derive(Debug)]
pub enum ProtocolError {
    /// Frame is not valid JSON or has wrongly typed fields
    Malformed(String),

    /// A field required for sample frames is missing
    MissingField(&'static str),

    /// A field carries a value outside its allowed range
    InvalidValue { field: &'static str, value: String },

    /// Frame payload is not valid UTF-8
    Encoding(std::str::Utf8Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(msg) => write!(f, "malformed frame: {}", msg),
            ProtocolError::MissingField(field) => {
                write!(f, "frame is missing required field `{}`", field)
            }
            ProtocolError::InvalidValue { field, value } => {
                write!(f, "invalid value for `{}`: {}", field, value)
            }
            ProtocolError::Encoding(err) => write!(f, "frame is not valid UTF-8: {}", err),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Encoding(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err.to_string())
    }
}

impl From<std::str::Utf8Error> for ProtocolError {
    fn from(err: std::str::Utf8Error) -> Self {
        ProtocolError::Encoding(err)
    }
}

/// Errors raised by a streaming transport
#[derive(Debug)]
pub enum TransportError {
    /// Connection could not be established
    ConnectFailed(String),

    /// Established connection failed while reading
    ReadFailed(String),

    /// URL could not be turned into a connection request
    InvalidRequest(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ConnectFailed(msg) => write!(f, "failed to connect: {}", msg),
            TransportError::ReadFailed(msg) => write!(f, "connection read failed: {}", msg),
            TransportError::InvalidRequest(msg) => write!(f, "invalid connection request: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Invalid dashboard configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Endpoint is not a valid URL
    InvalidEndpoint(String),

    /// Endpoint scheme is neither `ws` nor `wss`
    UnsupportedScheme(String),

    /// No datasets configured
    EmptyRegistry,

    /// Two datasets share an id
    DuplicateDataset(String),

    /// Dataset lists no channels
    EmptyDataset(String),

    /// A channel name appears twice within one dataset
    DuplicateChannel { dataset: String, channel: String },

    /// `initial_dataset` does not name a configured dataset
    UnknownInitialDataset(String),

    /// Reconnect delay must be positive
    ZeroReconnectDelay,

    /// Retention limits must be positive
    ZeroRetention,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidEndpoint(msg) => write!(f, "invalid endpoint: {}", msg),
            ConfigError::UnsupportedScheme(scheme) => {
                write!(f, "endpoint scheme must be ws or wss, got `{}`", scheme)
            }
            ConfigError::EmptyRegistry => write!(f, "no datasets configured"),
            ConfigError::DuplicateDataset(id) => write!(f, "dataset `{}` is defined twice", id),
            ConfigError::EmptyDataset(id) => write!(f, "dataset `{}` has no channels", id),
            ConfigError::DuplicateChannel { dataset, channel } => {
                write!(f, "channel `{}` is listed twice in dataset `{}`", channel, dataset)
            }
            ConfigError::UnknownInitialDataset(id) => {
                write!(f, "initial dataset `{}` is not configured", id)
            }
            ConfigError::ZeroReconnectDelay => write!(f, "reconnect delay must be positive"),
            ConfigError::ZeroRetention => write!(f, "retention limit must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from dataset switching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    /// Requested dataset is not in the registry
    UnknownDataset(String),

    /// A channel address could not be built from the endpoint
    InvalidChannelUrl(String),
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::UnknownDataset(id) => write!(f, "unknown dataset `{}`", id),
            DashboardError::InvalidChannelUrl(msg) => write!(f, "invalid channel URL: {}", msg),
        }
    }
}

impl std::error::Error for DashboardError {}
