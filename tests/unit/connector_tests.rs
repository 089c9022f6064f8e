/*!
 * Tests for the stream connector against scripted event sources
 */

use std::sync::Arc;
use std::time::Duration;

use resumeflow::errors::{ErrorKind, TransportError};
use resumeflow::protocol::Stage;
use resumeflow::session::{
    cancel_pair, ConnectorExit, SessionId, SessionPhase, SessionState, StreamConnector,
};

use crate::common::mock_transport::{Observed, RecordingObserver, ScriptedOpener, Step};
use crate::common::{event, legacy};

async fn run_script(script: Vec<Step>, timeout: Duration) -> (SessionState, ConnectorExit, Arc<ScriptedOpener>, RecordingObserver) {
    let opener = Arc::new(ScriptedOpener::with_script(script));
    let connector = StreamConnector::new(opener.clone(), timeout);
    let observer = RecordingObserver::default();
    let (_handle, mut cancel) = cancel_pair();
    let mut state = SessionState::new();

    let exit = connector
        .run(&SessionId::new("s1"), &mut state, &mut cancel, &observer)
        .await;
    (state, exit, opener, observer)
}

#[tokio::test]
async fn test_run_withStreamEndingEarly_shouldFailWithConnection() {
    let (state, exit, opener, _) = run_script(
        vec![event("classifying", "{}"), event("modified", r#"{"text":"partial"}"#)],
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(exit, ConnectorExit::Terminal);
    assert_eq!(state.error().map(|e| e.kind), Some(ErrorKind::Connection));
    // The last snapshot stays visible even though the session failed
    assert_eq!(state.buffer().snapshot(), "partial");
    assert!(opener.handle(0).is_closed());
}

#[tokio::test]
async fn test_run_withTransportDrop_shouldFailWithConnection() {
    let (state, _, _, _) = run_script(
        vec![
            event("classifying", "{}"),
            Step::Fail(TransportError::StreamDropped("connection reset".to_string())),
        ],
        Duration::from_secs(5),
    )
    .await;

    let error = state.error().expect("session should have failed");
    assert_eq!(error.kind, ErrorKind::Connection);
    assert!(error.message.contains("connection reset"));
}

#[tokio::test]
async fn test_run_withServerError_shouldUsePayloadMessage() {
    let (state, _, _, observer) = run_script(
        vec![event("error", r#"{"message":"model overloaded"}"#), event("success", "{}")],
        Duration::from_secs(5),
    )
    .await;

    let error = state.error().unwrap();
    assert_eq!(error.kind, ErrorKind::ServerReported);
    assert_eq!(error.message, "model overloaded");
    assert_eq!(observer.finished(), vec!["failed".to_string()]);
}

#[tokio::test]
async fn test_run_withGarbledSuccessEnvelope_shouldFailWithParse() {
    let (state, _, opener, _) = run_script(
        vec![event("modified", r#"{"text":"v1"}"#), event("success", "{broken"), event("modified", r#"{"text":"v2"}"#)],
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(state.error().map(|e| e.kind), Some(ErrorKind::Parse));
    assert_eq!(opener.handle(0).delivered(), 2);
    assert_eq!(state.buffer().snapshot(), "v1");
}

#[tokio::test]
async fn test_run_withOpenFailure_shouldFailWithConnection() {
    let opener = Arc::new(ScriptedOpener::failing(TransportError::ApiError {
        status_code: 404,
        message: "unknown session".to_string(),
    }));
    let connector = StreamConnector::new(opener.clone(), Duration::from_secs(5));
    let (_handle, mut cancel) = cancel_pair();
    let mut state = SessionState::new();

    let exit = connector
        .run(&SessionId::new("missing"), &mut state, &mut cancel, &RecordingObserver::default())
        .await;

    assert_eq!(exit, ConnectorExit::Terminal);
    assert!(matches!(state.phase(), SessionPhase::Failed(e) if e.kind == ErrorKind::Connection));
}

#[tokio::test]
async fn test_run_withLegacyFrames_shouldReachSuccess() {
    let (state, _, _, observer) = run_script(
        vec![
            legacy(r#"{"type":"start"}"#),
            legacy(r#"{"type":"update","text":"v1"}"#),
            legacy(r#"{"type":"end1","text":"engineering"}"#),
            legacy(r#"{"type":"update","text":"v2"}"#),
            legacy(r#"{"type":"end2","text":"v2"}"#),
            legacy(r#"{"type":"end3","text":"unverified draft"}"#),
        ],
        Duration::from_secs(5),
    )
    .await;

    assert_eq!(state.phase(), &SessionPhase::Succeeded);
    assert_eq!(state.buffer().snapshot(), "v2");
    assert_eq!(state.tracker().category(), Some("engineering"));
    assert_eq!(observer.snapshots(), vec!["v1".to_string(), "v2".to_string()]);
}

#[tokio::test]
async fn test_run_shouldNotifyConnectedFirst() {
    let (_, _, _, observer) = run_script(vec![event("success", "{}")], Duration::from_secs(5)).await;
    let events = observer.events();
    assert_eq!(events[0], Observed::Status(Stage::Connected, "connected".to_string()));
    assert_eq!(events.last(), Some(&Observed::Finished("succeeded".to_string())));
}

#[tokio::test]
async fn test_run_withCancelBeforeFrames_shouldEndAbandonedWithoutNotifying() {
    let opener = Arc::new(ScriptedOpener::with_script(vec![
        Step::Delay(Duration::from_millis(200)),
        event("success", "{}"),
    ]));
    let connector = StreamConnector::new(opener.clone(), Duration::from_secs(5));
    let (handle, mut cancel) = cancel_pair();
    let mut state = SessionState::new();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.cancel();
    });

    let observer = RecordingObserver::default();
    let exit = connector
        .run(&SessionId::new("s1"), &mut state, &mut cancel, &observer)
        .await;
    canceller.await.unwrap();

    assert_eq!(exit, ConnectorExit::Cancelled);
    assert!(state.phase().is_terminal());
    assert!(state.phase().is_abandoned());
    assert!(observer.finished().is_empty());
    assert!(opener.handle(0).is_closed());
    assert_eq!(opener.handle(0).delivered(), 0);
}
