/*!
 * End-to-end session scenarios driven through the client
 */

use std::sync::Arc;
use std::time::Duration;

use resumeflow::errors::{ErrorKind, TransportError};
use resumeflow::persistence::RecordStore;
use resumeflow::protocol::Stage;
use resumeflow::session::{PersistenceStatus, SessionClient, SessionPhase};

use crate::common::mock_transport::{
    MemoryRecordStore, Observed, RecordingObserver, ScriptedHandshake, ScriptedOpener, Step,
};
use crate::common::{event, full_job_script, init_test_logging, sample_request, scripted_client};

const GENEROUS: Duration = Duration::from_secs(5);

async fn wait_for_open(opener: &ScriptedOpener, count: usize) {
    for _ in 0..200 {
        if opener.open_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("stream was never opened");
}

#[tokio::test]
async fn test_run_withRejectedInput_shouldEndRejectedWithEmptyBuffer() {
    let handshake = Arc::new(ScriptedHandshake::issuing("s-reject"));
    let opener = Arc::new(ScriptedOpener::with_script(vec![
        event("classifying", "{}"),
        event("modified", r#"{"text":"early draft"}"#),
        event("is_resume", r#"{"is_resume":"no"}"#),
        event("modified", r#"{"text":"late draft"}"#),
    ]));
    let client = scripted_client(handshake, opener.clone(), GENEROUS);
    let observer = RecordingObserver::default();

    let report = client.run(sample_request(), &observer).await;

    assert!(matches!(report.phase(), SessionPhase::Rejected(_)));
    assert_eq!(report.error().map(|e| e.kind), Some(ErrorKind::InputRejected));
    assert!(report.state.buffer().is_empty());
    assert!(report.state.tracker().is_rejected());
    assert_eq!(report.output(), None);
    // The frame after the verdict is never read
    assert_eq!(opener.handle(0).delivered(), 3);
    assert!(opener.handle(0).is_closed());
}

#[tokio::test]
async fn test_run_withFullJob_shouldSucceedWithLastSnapshot() {
    init_test_logging();
    let handshake = Arc::new(ScriptedHandshake::issuing("s-full"));
    let opener = Arc::new(ScriptedOpener::with_script(full_job_script()));
    let client = scripted_client(handshake.clone(), opener.clone(), GENEROUS);
    let observer = RecordingObserver::default();

    let report = client.run(sample_request(), &observer).await;

    assert!(report.is_success());
    assert_eq!(report.output(), Some("Draft v2"));
    assert_eq!(report.state.tracker().status_text(), "");
    assert_eq!(report.state.tracker().category(), Some("engineering"));
    assert_eq!(report.state.tracker().subcategory(), Some("backend"));
    assert_eq!(report.session_id.as_ref().map(|s| s.as_str()), Some("s-full"));
    assert_eq!(report.persistence, PersistenceStatus::NotAttempted);

    assert_eq!(handshake.calls(), 1);
    assert_eq!(handshake.last_request(), Some(sample_request()));
    assert_eq!(opener.opened_session(0).as_str(), "s-full");
    assert_eq!(observer.snapshots(), vec!["Draft v1".to_string(), "Draft v2".to_string()]);
    assert!(observer
        .events()
        .contains(&Observed::Status(Stage::Formatting, "polishing layout".to_string())));
    assert_eq!(observer.finished(), vec!["succeeded".to_string()]);
    assert!(!client.is_active());
}

#[tokio::test]
async fn test_run_withSilentStream_shouldTimeOutAndClose() {
    init_test_logging();
    let handshake = Arc::new(ScriptedHandshake::issuing("s-slow"));
    let opener = Arc::new(ScriptedOpener::with_script(vec![
        event("classifying", "{}"),
        Step::Hang,
    ]));
    let client = scripted_client(handshake, opener.clone(), Duration::from_millis(80));
    let observer = RecordingObserver::default();

    let report = client.run(sample_request(), &observer).await;

    assert!(matches!(report.phase(), SessionPhase::TimedOut(_)));
    assert_eq!(report.error().map(|e| e.kind), Some(ErrorKind::Timeout));
    assert!(opener.handle(0).is_closed());
    assert_eq!(observer.finished(), vec!["timed-out".to_string()]);
}

#[tokio::test]
async fn test_run_withFailedHandshake_shouldNeverOpenStream() {
    let handshake = Arc::new(ScriptedHandshake::failing(TransportError::ApiError {
        status_code: 500,
        message: "model unavailable".to_string(),
    }));
    let opener = Arc::new(ScriptedOpener::with_script(full_job_script()));
    let client = scripted_client(handshake, opener.clone(), GENEROUS);
    let observer = RecordingObserver::default();

    let report = client.run(sample_request(), &observer).await;

    let error = report.error().expect("handshake failure should be reported");
    assert_eq!(error.kind, ErrorKind::Handshake);
    assert!(error.message.contains("model unavailable"));
    assert!(report.session_id.is_none());
    assert_eq!(opener.open_count(), 0);
    assert_eq!(observer.finished(), vec!["failed".to_string()]);
}

#[tokio::test]
async fn test_run_withMalformedProgressFrames_shouldKeepStreaming() {
    let handshake = Arc::new(ScriptedHandshake::issuing("s-noisy"));
    let opener = Arc::new(ScriptedOpener::with_script(vec![
        event("modified", "{not json"),
        event("heartbeat", "{}"),
        event("modified", r#"{"text":"Draft v1"}"#),
        event("success", "{}"),
    ]));
    let client = scripted_client(handshake, opener, GENEROUS);

    let report = client.run(sample_request(), &RecordingObserver::default()).await;

    assert!(report.is_success());
    assert_eq!(report.output(), Some("Draft v1"));
}

#[tokio::test]
async fn test_run_withFinalTextInSuccess_shouldPreferIt() {
    let handshake = Arc::new(ScriptedHandshake::issuing("s-final"));
    let opener = Arc::new(ScriptedOpener::with_script(vec![
        event("modified", r#"{"text":"Draft v1"}"#),
        event("success", r#"{"text":"Final"}"#),
    ]));
    let client = scripted_client(handshake, opener, GENEROUS);

    let report = client.run(sample_request(), &RecordingObserver::default()).await;
    assert_eq!(report.output(), Some("Final"));
}

#[tokio::test]
async fn test_run_whileAnotherRuns_shouldAbandonThePrevious() {
    init_test_logging();
    let handshake = Arc::new(ScriptedHandshake::issuing("s-shared"));
    let opener = Arc::new(ScriptedOpener::with_scripts(vec![
        vec![event("classifying", "{}"), Step::Hang],
        full_job_script(),
    ]));
    let client = Arc::new(scripted_client(handshake, opener.clone(), Duration::from_millis(150)));
    let first_observer = Arc::new(RecordingObserver::default());

    let first = {
        let client = client.clone();
        let observer = first_observer.clone();
        tokio::spawn(async move { client.run(sample_request(), observer.as_ref()).await })
    };
    wait_for_open(&opener, 1).await;
    assert!(client.is_active());

    let second = client.run(sample_request(), &RecordingObserver::default()).await;
    let first = first.await.unwrap();

    assert!(first.abandoned());
    assert!(!first.is_success());
    assert!(first.phase().is_terminal());
    assert_eq!(first.error().map(|e| e.kind), Some(ErrorKind::Connection));
    assert!(opener.handle(0).is_closed());
    assert!(second.is_success());
    assert_ne!(first.run_id, second.run_id);

    // Well past the first session's deadline: no late notification for it
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(first_observer.finished().is_empty());
    assert!(!client.is_active());
}

#[tokio::test]
async fn test_cancelActive_shouldAbandonRunningSession() {
    let handshake = Arc::new(ScriptedHandshake::issuing("s-cancel"));
    let opener = Arc::new(ScriptedOpener::with_script(vec![Step::Hang]));
    let client = Arc::new(scripted_client(handshake, opener.clone(), GENEROUS));

    let running = {
        let client = client.clone();
        tokio::spawn(async move { client.run(sample_request(), &RecordingObserver::default()).await })
    };
    wait_for_open(&opener, 1).await;

    assert!(client.cancel_active());
    let report = running.await.unwrap();
    assert!(report.abandoned());
    assert!(matches!(report.phase(), SessionPhase::Failed(_)));
    assert_eq!(report.output(), None);
    assert!(opener.handle(0).is_closed());
    assert!(!client.cancel_active());
}

#[tokio::test]
async fn test_cancelActive_duringHandshake_shouldSkipStream() {
    let handshake = Arc::new(ScriptedHandshake::issuing("s-early").delayed(Duration::from_millis(200)));
    let opener = Arc::new(ScriptedOpener::with_script(full_job_script()));
    let client = Arc::new(scripted_client(handshake, opener.clone(), GENEROUS));

    let running = {
        let client = client.clone();
        tokio::spawn(async move { client.run(sample_request(), &RecordingObserver::default()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    client.cancel_active();

    let report = running.await.unwrap();
    assert!(report.abandoned());
    assert!(report.phase().is_terminal());
    assert!(report.session_id.is_none());
    assert_eq!(opener.open_count(), 0);
}

#[tokio::test]
async fn test_run_withStore_shouldSaveResultWithClassification() {
    let store = Arc::new(MemoryRecordStore::default());
    let client = SessionClient::new(
        Arc::new(ScriptedHandshake::issuing("s-save")),
        Arc::new(ScriptedOpener::with_script(full_job_script())),
        GENEROUS,
    )
    .with_store(store.clone(), "user123");

    let report = client.run(sample_request(), &RecordingObserver::default()).await;

    assert_eq!(report.persistence, PersistenceStatus::Saved(1));
    let saved = store.get(1).await.unwrap().expect("record should be saved");
    assert_eq!(saved.modified_content, "Draft v2");
    assert_eq!(saved.original_content, sample_request().source_text());
    assert_eq!(saved.user_id.as_deref(), Some("user123"));
    assert_eq!(saved.resume_classification.as_deref(), Some("engineering"));
    assert_eq!(saved.modified_resume_classification.as_deref(), Some("backend"));
}

#[tokio::test]
async fn test_run_withFailingStore_shouldStillSucceed() {
    let client = SessionClient::new(
        Arc::new(ScriptedHandshake::issuing("s-unsaved")),
        Arc::new(ScriptedOpener::with_script(full_job_script())),
        GENEROUS,
    )
    .with_store(Arc::new(MemoryRecordStore::failing()), "user123");

    let report = client.run(sample_request(), &RecordingObserver::default()).await;

    assert!(report.is_success());
    assert!(!report.abandoned());
    assert!(matches!(report.persistence, PersistenceStatus::Failed(_)));
}

#[tokio::test]
async fn test_run_withFailedSession_shouldNotSave() {
    let store = Arc::new(MemoryRecordStore::default());
    let client = SessionClient::new(
        Arc::new(ScriptedHandshake::issuing("s-error")),
        Arc::new(ScriptedOpener::with_script(vec![event("error", r#"{"message":"quota exceeded"}"#)])),
        GENEROUS,
    )
    .with_store(store.clone(), "user123");

    let report = client.run(sample_request(), &RecordingObserver::default()).await;

    assert_eq!(report.error().map(|e| e.message.as_str()), Some("quota exceeded"));
    assert_eq!(report.persistence, PersistenceStatus::NotAttempted);
    assert!(store.records().is_empty());
}
