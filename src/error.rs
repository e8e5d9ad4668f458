//! Error types shared by the library modules.

use std::time::Duration;

/// Missing or unusable configuration. Raised before any network or process work.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} environment variable is required. Please set it in your .env file or environment.")]
    MissingVar { name: &'static str },

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Failures seen by the driver side of the line protocol.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The executor closed its output before answering.
    #[error("executor closed the stream before responding")]
    EndOfStream,

    #[error("no response from executor within {0:?}")]
    Timeout(Duration),

    /// A previous call timed out, so replies may no longer pair with requests.
    #[error("stream is out of sync after an earlier timeout")]
    Desynchronized,

    #[error("malformed response {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The executor answered with an `error` reply instead of captured output.
    #[error("executor rejected request: {0}")]
    Rejected(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;
