//! Error types for cyclestats.

use thiserror::Error;

/// Every error produced by cyclestats
#[derive(Error, Debug)]
pub enum CycleStatsError {
    /// Invalid or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A grouping glob that does not compile
    #[error("Invalid grouping pattern '{pattern}': {reason}")]
    Pattern {
        /// The glob as configured
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// A metric whose name matches no grouping glob
    #[error("Measurement '{0}' matches no grouping pattern")]
    UnmatchedMeasurement(String),

    /// Transport failure talking to the portal
    #[error("Network error: {0}")]
    Network(String),

    /// Portal answered with a non-2xx status
    #[error("Unsuccessful status code: {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// Portal lookup exceeded its timeout
    #[error("Timeout error: operation took longer than {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// Undecodable response or input
    #[error("Parse error: {message}")]
    Parse {
        /// Decoder message
        message: String,
    },

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Pipeline output queue closed
    #[error("Channel send error")]
    ChannelSend,
}

/// Result type alias for cyclestats operations
pub type Result<T> = std::result::Result<T, CycleStatsError>;

impl CycleStatsError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } | Self::ChannelSend => true,
            Self::Http { status } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Pattern { .. } => "config",
            Self::UnmatchedMeasurement(_) => "grouping",
            Self::Network(_) | Self::Http { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Io(_) => "io",
            Self::Serialization(_) | Self::Yaml(_) | Self::Parse { .. } => "serialization",
            Self::ChannelSend => "channel",
        }
    }
}
