//! Error types for loading exports and skeleton configuration.
//!
//! Tick-time absences (missing frames, dropouts, names a dataset doesn't
//! have) are not errors; see [`crate::alignment::IncompleteReason`].

use thiserror::Error;

/// Why an export was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatReason {
    /// The file ended before the column-title line was reached.
    #[error("no data section found")]
    NoDataSection,
    /// A title token had no `namespace:name` shape.
    #[error("malformed marker title {0:?}")]
    MalformedTitle(String),
}

/// Failure of a single load attempt. The previously loaded dataset stays active.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `line` is 1-based.
    #[error("Format error at line {line}: {reason}")]
    Format { line: usize, reason: FormatReason },
}

/// Problems with skeleton/alignment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Unknown marker: {0}")]
    UnknownMarker(String),

    #[error("Invalid connection label: {0:?}")]
    InvalidConnectionLabel(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LoadResult<T> = Result<T, LoadError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
