/*!
 * Lifetime of one event-stream connection.
 *
 * The connector opens the stream, turns every frame into an
 * `InboundSignal`, feeds it through the session state machine and closes
 * the stream on the first terminal transition. A single deadline is armed
 * when the stream is opened and is dropped together with the connection,
 * so it cannot fire for a session that already ended or was abandoned.
 *
 * An abandoned session is ended through the state machine like any other,
 * but its observer is not told: the caller has already moved on.
 */

use log::{debug, trace};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::errors::TransportError;
use crate::protocol::{SseFrame, StreamEvent};
use crate::transport::StreamOpener;
use super::cancel::CancelSignal;
use super::dispatch::{Change, InboundSignal};
use super::models::{SessionId, SessionState};
use super::observer::SessionObserver;

/// How a connector run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorExit {
    /// The session reached a terminal phase
    Terminal,
    /// The caller abandoned the session
    Cancelled,
}

enum Step {
    Cancelled,
    Signal(InboundSignal),
}

/// Drives one session's event stream to a terminal phase
#[derive(Clone)]
pub struct StreamConnector {
    opener: Arc<dyn StreamOpener>,
    timeout: Duration,
}

impl StreamConnector {
    pub fn new(opener: Arc<dyn StreamOpener>, timeout: Duration) -> Self {
        Self { opener, timeout }
    }

    /// Run the stream of `session_id` until a terminal phase or cancellation
    pub async fn run(
        &self,
        session_id: &SessionId,
        state: &mut SessionState,
        cancel: &mut CancelSignal,
        observer: &dyn SessionObserver,
    ) -> ConnectorExit {
        let deadline = sleep(self.timeout);
        tokio::pin!(deadline);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = &mut deadline => Some(Err(InboundSignal::DeadlineElapsed(self.timeout))),
            opened = self.opener.open(session_id) => {
                Some(opened.map_err(InboundSignal::OpenFailed))
            }
        };

        let mut source = match opened {
            None => {
                debug!("Session {} abandoned while opening the stream", session_id);
                state.handle(&InboundSignal::Cancelled);
                return ConnectorExit::Cancelled;
            }
            Some(Err(signal)) => {
                Self::deliver(state, &signal, observer);
                return ConnectorExit::Terminal;
            }
            Some(Ok(source)) => source,
        };

        Self::deliver(state, &InboundSignal::Opened, observer);

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                _ = &mut deadline => Step::Signal(InboundSignal::DeadlineElapsed(self.timeout)),
                frame = source.next_frame() => Step::Signal(Self::signal_for(frame)),
            };

            match step {
                Step::Cancelled => {
                    debug!("Session {} abandoned, closing stream", session_id);
                    source.close();
                    state.handle(&InboundSignal::Cancelled);
                    return ConnectorExit::Cancelled;
                }
                Step::Signal(signal) => {
                    Self::deliver(state, &signal, observer);
                    if state.phase().is_terminal() {
                        debug!("Session {} finished as {}, closing stream", session_id, state.phase());
                        source.close();
                        return ConnectorExit::Terminal;
                    }
                }
            }
        }
    }

    fn signal_for(frame: Option<Result<SseFrame, TransportError>>) -> InboundSignal {
        match frame {
            Some(Ok(frame)) => match StreamEvent::decode(&frame) {
                Ok(event) => InboundSignal::Event(event),
                Err(error) => InboundSignal::Malformed(error),
            },
            Some(Err(cause)) => InboundSignal::TransportFailed(cause),
            None => InboundSignal::StreamEnded,
        }
    }

    /// Apply one signal and tell the observer what changed
    fn deliver(state: &mut SessionState, signal: &InboundSignal, observer: &dyn SessionObserver) {
        trace!("Inbound signal: {:?}", signal);
        match state.handle(signal) {
            Some(Change::Status) => {
                observer.on_status(state.tracker().stage(), state.tracker().status_text());
            }
            Some(Change::Snapshot { with_status }) => {
                if with_status {
                    observer.on_status(state.tracker().stage(), state.tracker().status_text());
                }
                observer.on_snapshot(state.buffer().snapshot());
            }
            Some(Change::Finished) => observer.on_finished(state.phase()),
            None => {}
        }
    }
}
