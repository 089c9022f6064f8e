/*!
 * Error types for the resumeflow application.
 *
 * This module contains the session failure taxonomy surfaced to callers,
 * plus the lower-level errors of the transport and record-store layers,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use thiserror::Error;

/// Kind of terminal failure a session can end with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The handshake request failed or returned a non-success response
    Handshake,
    /// The server judged the submitted text not to be valid job input
    InputRejected,
    /// The stream dropped or failed to open
    Connection,
    /// A terminal envelope could not be decoded
    Parse,
    /// The deadline elapsed before any terminal event arrived
    Timeout,
    /// The server explicitly reported a business failure mid-stream
    ServerReported,
}

impl ErrorKind {
    /// Stable identifier used in logs and the CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handshake => "handshake_error",
            Self::InputRejected => "input_rejected",
            Self::Connection => "connection",
            Self::Parse => "parse",
            Self::Timeout => "timeout",
            Self::ServerReported => "server_reported",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured terminal error of a session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SessionError {
    /// Taxonomy entry
    pub kind: ErrorKind,
    /// User-facing message
    pub message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors raised by the handshake and event-stream transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The HTTP request could not be sent or completed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The server answered with a non-success status
    #[error("Server responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the server
        message: String,
    },

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// An established stream dropped before it was closed
    #[error("Stream dropped: {0}")]
    StreamDropped(String),
}

/// Errors that can occur when talking to the record store
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Error when making a request to the record service fails
    #[error("Record service request failed: {0}")]
    RequestFailed(String),

    /// The record service answered with `success: false`
    #[error("Record service rejected the request: {0}")]
    Rejected(String),

    /// The record does not exist
    #[error("Record {0} not found")]
    NotFound(i64),

    /// Local storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<reqwest::Error> for PersistenceError {
    fn from(error: reqwest::Error) -> Self {
        Self::RequestFailed(error.to_string())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal failure of a transformation session
    #[error("Session failed ({}): {}", .0.kind, .0.message)]
    Session(#[from] SessionError),

    /// Error from the transport layer
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error from the record store
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
