/*!
 * Tests for the error taxonomy and conversions
 */

use std::time::Duration;

use resumeflow::errors::{AppError, ErrorKind, PersistenceError, SessionError, TransportError};
use resumeflow::protocol::DecodeError;
use resumeflow::session::{classify, RawFailure};

#[test]
fn test_classify_everyRawFailure_shouldMapToDistinctKind() {
    let cases = vec![
        (
            RawFailure::Handshake(TransportError::RequestFailed("refused".to_string())),
            ErrorKind::Handshake,
        ),
        (RawFailure::InputRejected, ErrorKind::InputRejected),
        (
            RawFailure::StreamDropped(TransportError::StreamDropped("reset".to_string())),
            ErrorKind::Connection,
        ),
        (
            RawFailure::MalformedTerminal(DecodeError {
                label: "success".to_string(),
                terminal: true,
                reason: "bad json".to_string(),
            }),
            ErrorKind::Parse,
        ),
        (RawFailure::DeadlineElapsed(Duration::from_secs(5)), ErrorKind::Timeout),
        (RawFailure::ServerReported { message: None }, ErrorKind::ServerReported),
    ];

    for (raw, kind) in cases {
        let error = classify(&raw);
        assert_eq!(error.kind, kind, "wrong kind for {:?}", raw);
        assert!(!error.message.is_empty());
    }
}

#[test]
fn test_errorKind_display_shouldUseStableIdentifier() {
    assert_eq!(ErrorKind::Handshake.to_string(), "handshake_error");
    assert_eq!(ErrorKind::InputRejected.to_string(), "input_rejected");
    assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
}

#[test]
fn test_appError_fromSessionError_shouldKeepKindInMessage() {
    let error: AppError = SessionError::new(ErrorKind::Timeout, "too slow").into();
    let text = error.to_string();
    assert!(text.contains("timeout"));
    assert!(text.contains("too slow"));
}

#[test]
fn test_appError_fromIoError_shouldBeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    assert!(matches!(AppError::from(io), AppError::File(_)));
}

#[test]
fn test_persistenceError_notFound_shouldNameRecord() {
    assert_eq!(PersistenceError::NotFound(9).to_string(), "Record 9 not found");
}
