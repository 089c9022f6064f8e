/*!
 * Single-session client.
 *
 * `SessionClient` owns at most one active session. Starting a run cancels
 * the previous one before any new state exists, then performs the
 * handshake, drives the stream and finally hands a successful result to the
 * record store. A save failure is reported next to the result and never
 * changes the session's terminal phase.
 */

use log::{error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::SessionError;
use crate::persistence::{NewRecord, RecordId, RecordStore};
use crate::transport::{Handshake, StreamOpener};
use super::cancel::{cancel_pair, CancelHandle, CancelSignal};
use super::connector::{ConnectorExit, StreamConnector};
use super::dispatch::{InboundSignal, Transition};
use super::initiator::SessionInitiator;
use super::models::{SessionId, SessionPhase, SessionState, TransformRequest};
use super::observer::SessionObserver;

/// Outcome of the best-effort save of a successful result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    /// No store configured, or the session did not succeed
    NotAttempted,
    /// Saved under this id
    Saved(RecordId),
    /// The save failed; the session result is still valid
    Failed(String),
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Identifier of this run in the logs
    pub run_id: Uuid,
    /// Issued by the handshake; `None` when the handshake failed
    pub session_id: Option<SessionId>,
    /// Final session state, always in a terminal phase
    pub state: SessionState,
    pub persistence: PersistenceStatus,
}

impl SessionReport {
    pub fn phase(&self) -> &SessionPhase {
        self.state.phase()
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.state.error()
    }

    /// The session was cancelled before the server finished it
    pub fn abandoned(&self) -> bool {
        self.state.phase().is_abandoned()
    }

    pub fn is_success(&self) -> bool {
        *self.state.phase() == SessionPhase::Succeeded
    }

    /// The final artifact of a successful session
    pub fn output(&self) -> Option<&str> {
        if self.is_success() {
            Some(self.state.buffer().snapshot())
        } else {
            None
        }
    }
}

struct ActiveSession {
    generation: u64,
    cancel: CancelHandle,
}

/// Client running one transformation session at a time
pub struct SessionClient {
    initiator: SessionInitiator,
    connector: StreamConnector,
    store: Option<Arc<dyn RecordStore>>,
    user_id: String,
    active: Mutex<Option<ActiveSession>>,
    generation: AtomicU64,
}

impl SessionClient {
    /// Create a client without a record store
    pub fn new(
        handshake: Arc<dyn Handshake>,
        opener: Arc<dyn StreamOpener>,
        timeout: Duration,
    ) -> Self {
        Self {
            initiator: SessionInitiator::new(handshake),
            connector: StreamConnector::new(opener, timeout),
            store: None,
            user_id: String::new(),
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Save successful results to `store` on behalf of `user_id`
    pub fn with_store(mut self, store: Arc<dyn RecordStore>, user_id: impl Into<String>) -> Self {
        self.store = Some(store);
        self.user_id = user_id.into();
        self
    }

    /// Whether a session is currently running
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Abandon the active session, if any
    pub fn cancel_active(&self) -> bool {
        match self.active.lock().take() {
            Some(previous) => {
                info!("Cancelling active session (run #{})", previous.generation);
                previous.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Run one session to completion
    pub async fn run(&self, request: TransformRequest, observer: &dyn SessionObserver) -> SessionReport {
        let (mut cancel, generation) = self.activate();
        let run_id = Uuid::new_v4();
        let mut state = SessionState::new();
        info!("Starting session run {} (#{})", run_id, generation);

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            started = self.initiator.start(&request) => Some(started),
        };

        let session_id = match started {
            None => {
                info!("Session run {} abandoned during the handshake", run_id);
                state.handle(&InboundSignal::Cancelled);
                return self.report(generation, run_id, None, state, PersistenceStatus::NotAttempted);
            }
            Some(Err(error)) => {
                warn!("Session run {} failed to start: {}", run_id, error);
                if state.apply(Transition::Fail(error)).is_some() {
                    observer.on_finished(state.phase());
                }
                return self.report(generation, run_id, None, state, PersistenceStatus::NotAttempted);
            }
            Some(Ok(session_id)) => session_id,
        };

        let exit = self
            .connector
            .run(&session_id, &mut state, &mut cancel, observer)
            .await;

        if exit == ConnectorExit::Cancelled {
            info!("Session {} abandoned", session_id);
            return self.report(generation, run_id, Some(session_id), state, PersistenceStatus::NotAttempted);
        }

        match state.error() {
            Some(error) => warn!("Session {} ended with {}: {}", session_id, error.kind, error.message),
            None => info!("Session {} finished as {}", session_id, state.phase()),
        }

        self.release(generation);
        let persistence = self.persist(&request, &state).await;
        self.report(generation, run_id, Some(session_id), state, persistence)
    }

    /// Cancel the previous session and register a new one
    fn activate(&self) -> (CancelSignal, u64) {
        let (handle, signal) = cancel_pair();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = self
            .active
            .lock()
            .replace(ActiveSession { generation, cancel: handle });
        if let Some(previous) = previous {
            info!(
                "Cancelling session run #{} before starting #{}",
                previous.generation, generation
            );
            previous.cancel.cancel();
        }

        (signal, generation)
    }

    /// Clear the active slot if it still belongs to `generation`
    fn release(&self, generation: u64) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|a| a.generation == generation) {
            *active = None;
        }
    }

    async fn persist(&self, request: &TransformRequest, state: &SessionState) -> PersistenceStatus {
        let Some(store) = &self.store else {
            return PersistenceStatus::NotAttempted;
        };
        if *state.phase() != SessionPhase::Succeeded {
            return PersistenceStatus::NotAttempted;
        }

        let record = NewRecord::completed(
            request.source_text(),
            state.buffer().snapshot(),
            request.instructions(),
            self.user_id.clone(),
        )
        .with_classification(
            state.tracker().category().map(str::to_string),
            state.tracker().subcategory().map(str::to_string),
        );

        match store.create(record).await {
            Ok(id) => {
                info!("Saved result as record {}", id);
                PersistenceStatus::Saved(id)
            }
            Err(e) => {
                error!("Failed to save result: {}", e);
                PersistenceStatus::Failed(e.to_string())
            }
        }
    }

    fn report(
        &self,
        generation: u64,
        run_id: Uuid,
        session_id: Option<SessionId>,
        state: SessionState,
        persistence: PersistenceStatus,
    ) -> SessionReport {
        self.release(generation);
        SessionReport {
            run_id,
            session_id,
            state,
            persistence,
        }
    }
}
