/*!
 * Mapping of raw failures onto the session error taxonomy.
 *
 * `classify` is a pure function: the same raw signal always yields the same
 * kind and message. Retrying is a caller policy and does not happen here.
 */

use std::time::Duration;

use crate::errors::{ErrorKind, SessionError, TransportError};
use crate::protocol::DecodeError;

const REJECTED_MESSAGE: &str =
    "The submitted text is not a valid submission for this job. Please check the input and try again.";
const PARSE_MESSAGE: &str =
    "Received an unreadable final response from the transformation service.";
const SERVER_FALLBACK_MESSAGE: &str =
    "The transformation service reported an error. Please try again later.";

/// Message of a session the caller abandoned
pub const ABANDONED_MESSAGE: &str = "The session was abandoned before it finished.";

/// A failure as observed, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFailure {
    /// The handshake request failed or was refused
    Handshake(TransportError),
    /// The server judged the input not to be valid job input
    InputRejected,
    /// The event stream could not be opened
    StreamOpenFailed(TransportError),
    /// The event stream failed after opening
    StreamDropped(TransportError),
    /// The event stream ended without a terminal event
    StreamEnded,
    /// A terminal envelope could not be decoded
    MalformedTerminal(DecodeError),
    /// No terminal event before the deadline
    DeadlineElapsed(Duration),
    /// The server reported a business failure
    ServerReported { message: Option<String> },
    /// The caller abandoned the session
    Abandoned,
}

/// Classify a raw failure into a kind and a user-facing message
pub fn classify(raw: &RawFailure) -> SessionError {
    match raw {
        RawFailure::Handshake(cause) => SessionError::new(
            ErrorKind::Handshake,
            format!("Could not start the transformation job: {}", handshake_detail(cause)),
        ),
        RawFailure::InputRejected => SessionError::new(ErrorKind::InputRejected, REJECTED_MESSAGE),
        RawFailure::StreamOpenFailed(cause) => SessionError::new(
            ErrorKind::Connection,
            format!("Could not connect to the transformation service: {}", cause),
        ),
        RawFailure::StreamDropped(cause) => SessionError::new(
            ErrorKind::Connection,
            format!("Lost connection to the transformation service: {}", cause),
        ),
        RawFailure::StreamEnded => SessionError::new(
            ErrorKind::Connection,
            "The connection closed before the transformation finished.",
        ),
        RawFailure::MalformedTerminal(_) => SessionError::new(ErrorKind::Parse, PARSE_MESSAGE),
        RawFailure::DeadlineElapsed(after) => SessionError::new(
            ErrorKind::Timeout,
            format!(
                "Processing took too long: no result after {}s. Please try again.",
                after.as_secs()
            ),
        ),
        RawFailure::ServerReported { message } => {
            let message = message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(SERVER_FALLBACK_MESSAGE);
            SessionError::new(ErrorKind::ServerReported, message)
        }
        RawFailure::Abandoned => SessionError::new(ErrorKind::Connection, ABANDONED_MESSAGE),
    }
}

fn handshake_detail(cause: &TransportError) -> String {
    match cause {
        TransportError::ApiError { message, .. } if !message.trim().is_empty() => message.clone(),
        other => other.to_string(),
    }
}
