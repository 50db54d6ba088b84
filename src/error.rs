//! Error types for tube-dl
//!
//! This module provides the crate's error taxonomy:
//! - [`Error`] — the primary error type returned by library operations
//! - [`ErrorKind`] — machine-readable failure categories carried in
//!   [`Event::Failed`](crate::types::Event::Failed) events
//!
//! Resolution-phase errors are reported before any job or file is created.
//! Transfer-phase errors always trigger partial-file cleanup before the
//! failure event is emitted. `Busy` is returned synchronously from
//! `submit` and never reaches the event channel.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for tube-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tube-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunk_size_bytes")
        key: Option<String>,
    },

    /// URL is malformed or the media host is unreachable
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Network error during metadata resolution or transfer
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Transfer ended with a byte count that does not match the descriptor
    #[error("truncated transfer: expected {expected} bytes, received {received}")]
    TruncatedTransfer {
        /// Bytes the descriptor promised
        expected: u64,
        /// Bytes actually received
        received: u64,
    },

    /// No progressive (audio+video, non-zero size) variant exists
    #[error("no suitable stream: {0}")]
    NoSuitableStream(String),

    /// Local file system error (create, write, flush, delete)
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),

    /// No bytes were received within the configured stall window
    #[error("transfer stalled for {stalled_for:?} with no bytes received")]
    Timeout {
        /// How long the transfer was stalled before giving up
        stalled_for: Duration,
    },

    /// Job was cancelled by the caller
    #[error("download cancelled")]
    Cancelled,

    /// A job is already active on this controller
    #[error("a download is already in progress (state: {state})")]
    Busy {
        /// The controller state that blocked the submission
        state: String,
    },

    /// Operation is not valid in the current controller state
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// The operation that was attempted (e.g., "cancel")
        operation: String,
        /// The controller state that prevents it
        state: String,
    },

    /// Serialization error (manifest decoding)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable category for this error
    ///
    /// Used to populate the `kind` field of failure events so consumers
    /// can branch on the category without parsing messages.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. } => ErrorKind::Config,
            Error::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Error::Network(_) | Error::TruncatedTransfer { .. } => ErrorKind::Network,
            Error::NoSuitableStream(_) => ErrorKind::NoSuitableStream,
            Error::Io(_) => ErrorKind::FileSystem,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Busy { .. } | Error::InvalidState { .. } => ErrorKind::Busy,
            Error::Serialization(_) => ErrorKind::Network,
        }
    }
}

/// Machine-readable failure category
///
/// Carried inside [`Event::Failed`](crate::types::Event::Failed) so UI
/// collaborators can distinguish failure classes without string matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid configuration value
    Config,
    /// Malformed or unreachable URL
    InvalidUrl,
    /// Network failure during resolution or transfer
    Network,
    /// No progressive variant available
    NoSuitableStream,
    /// Local disk failure
    FileSystem,
    /// Transfer stalled beyond the configured window
    Timeout,
    /// Cancelled by the caller
    Cancelled,
    /// Another job is already active
    Busy,
}
