/*!
 * Pure session state machine.
 *
 * `dispatch` maps the current state and one inbound signal to a
 * `Transition` without touching anything; `SessionState::apply` then
 * performs it. Keeping the two apart lets the whole protocol be exercised
 * without a live connection.
 */

use log::{debug, warn};
use std::time::Duration;

use crate::errors::{SessionError, TransportError};
use crate::protocol::{DecodeError, Stage, StreamEvent};
use super::classifier::{classify, RawFailure};
use super::models::{SessionPhase, SessionState};

/// Everything that can happen to a session once its id is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSignal {
    /// The event stream is open
    Opened,
    /// The event stream could not be opened
    OpenFailed(TransportError),
    /// A well-formed event arrived
    Event(StreamEvent),
    /// A frame arrived that could not be decoded
    Malformed(DecodeError),
    /// The transport failed mid-stream
    TransportFailed(TransportError),
    /// The stream ended without a terminal event
    StreamEnded,
    /// The session deadline elapsed
    DeadlineElapsed(Duration),
    /// The caller abandoned the session
    Cancelled,
}

/// Detail text attached to a classification stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageDetail {
    Category(String),
    Subcategory(String),
}

/// The effect one signal has on the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changes
    Ignore,
    /// A malformed non-terminal frame; nothing changes
    Skip(DecodeError),
    /// Initializing becomes streaming
    Open,
    /// Stage and status progress
    Advance {
        stage: Stage,
        status: Option<String>,
        detail: Option<StageDetail>,
    },
    /// A new output snapshot
    Replace {
        snapshot: String,
        stage: Option<Stage>,
        status: Option<String>,
    },
    /// Terminal success, optionally with the final snapshot
    Succeed { snapshot: Option<String> },
    /// Terminal rejection of the input
    Reject(SessionError),
    /// Terminal failure
    Fail(SessionError),
    /// Terminal timeout
    TimeOut(SessionError),
}

/// Observable result of applying a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Stage or status line changed
    Status,
    /// The snapshot changed, and the status too when `with_status` is set
    Snapshot { with_status: bool },
    /// The session reached a terminal phase
    Finished,
}

/// Decide what a signal does to a session in `state`
pub fn dispatch(state: &SessionState, signal: &InboundSignal) -> Transition {
    if state.phase.is_terminal() {
        return Transition::Ignore;
    }

    match signal {
        InboundSignal::Opened => match state.phase {
            SessionPhase::Initializing => Transition::Open,
            _ => Transition::Ignore,
        },
        InboundSignal::OpenFailed(cause) => {
            Transition::Fail(classify(&RawFailure::StreamOpenFailed(cause.clone())))
        }
        InboundSignal::Event(event) => dispatch_event(event),
        InboundSignal::Malformed(error) if error.terminal => {
            Transition::Fail(classify(&RawFailure::MalformedTerminal(error.clone())))
        }
        InboundSignal::Malformed(error) => Transition::Skip(error.clone()),
        InboundSignal::TransportFailed(cause) => {
            Transition::Fail(classify(&RawFailure::StreamDropped(cause.clone())))
        }
        InboundSignal::StreamEnded => Transition::Fail(classify(&RawFailure::StreamEnded)),
        InboundSignal::DeadlineElapsed(after) => {
            Transition::TimeOut(classify(&RawFailure::DeadlineElapsed(*after)))
        }
        InboundSignal::Cancelled => Transition::Fail(classify(&RawFailure::Abandoned)),
    }
}

fn dispatch_event(event: &StreamEvent) -> Transition {
    match event {
        StreamEvent::Started => Transition::Advance {
            stage: Stage::Connected,
            status: Some("job started".to_string()),
            detail: None,
        },
        StreamEvent::Classifying { status } => Transition::Advance {
            stage: Stage::Classifying,
            status: status.clone(),
            detail: None,
        },
        StreamEvent::DomainVerdict { accepted: true } => Transition::Advance {
            stage: Stage::Classifying,
            status: Some("input accepted".to_string()),
            detail: None,
        },
        StreamEvent::DomainVerdict { accepted: false } => {
            Transition::Reject(classify(&RawFailure::InputRejected))
        }
        StreamEvent::CategoryAssigned { category } => Transition::Advance {
            stage: Stage::Categorized,
            status: category.as_ref().map(|c| format!("category: {}", c)),
            detail: category.clone().map(StageDetail::Category),
        },
        StreamEvent::SubcategoryAssigned { subcategory } => Transition::Advance {
            stage: Stage::Subcategorized,
            status: subcategory.as_ref().map(|c| format!("sub-category: {}", c)),
            detail: subcategory.clone().map(StageDetail::Subcategory),
        },
        StreamEvent::Snapshot { text, stage, status } => Transition::Replace {
            snapshot: text.clone(),
            stage: *stage,
            status: status.clone(),
        },
        StreamEvent::Formatting { status } => Transition::Advance {
            stage: Stage::Formatting,
            status: status.clone(),
            detail: None,
        },
        StreamEvent::Succeeded { text } => Transition::Succeed {
            snapshot: text.clone(),
        },
        StreamEvent::ServerError { message } => Transition::Fail(classify(&RawFailure::ServerReported {
            message: message.clone(),
        })),
    }
}

impl SessionState {
    /// Perform a transition, reporting what observably changed
    ///
    /// Terminal sessions are never mutated.
    pub fn apply(&mut self, transition: Transition) -> Option<Change> {
        if self.phase.is_terminal() {
            return None;
        }

        match transition {
            Transition::Ignore => None,
            Transition::Skip(error) => {
                warn!("Skipping {}", error);
                None
            }
            Transition::Open => {
                self.phase = SessionPhase::Streaming;
                self.tracker.record(Stage::Connected, None);
                Some(Change::Status)
            }
            Transition::Advance { stage, status, detail } => {
                self.begin_streaming();
                match detail {
                    Some(StageDetail::Category(text)) => self.tracker.set_category(text),
                    Some(StageDetail::Subcategory(text)) => self.tracker.set_subcategory(text),
                    None => {}
                }
                self.tracker.record(stage, status.as_deref());
                Some(Change::Status)
            }
            Transition::Replace { snapshot, stage, status } => {
                self.begin_streaming();
                self.buffer.replace(snapshot);
                let with_status = match (stage, status) {
                    (Some(stage), status) => {
                        self.tracker.record(stage, status.as_deref());
                        true
                    }
                    (None, Some(status)) => {
                        let current = self.tracker.stage();
                        self.tracker.record(current, Some(status.as_str()));
                        true
                    }
                    (None, None) => false,
                };
                Some(Change::Snapshot { with_status })
            }
            Transition::Succeed { snapshot } => {
                if let Some(snapshot) = snapshot {
                    self.buffer.replace(snapshot);
                }
                self.buffer.freeze();
                self.tracker.complete();
                self.finish(SessionPhase::Succeeded)
            }
            Transition::Reject(error) => {
                self.buffer.clear();
                self.tracker.mark_rejected();
                self.finish(SessionPhase::Rejected(error))
            }
            Transition::Fail(error) => self.finish(SessionPhase::Failed(error)),
            Transition::TimeOut(error) => self.finish(SessionPhase::TimedOut(error)),
        }
    }

    /// Feed one signal through dispatch and apply
    pub fn handle(&mut self, signal: &InboundSignal) -> Option<Change> {
        let transition = dispatch(self, signal);
        self.apply(transition)
    }

    fn begin_streaming(&mut self) {
        if self.phase == SessionPhase::Initializing {
            self.phase = SessionPhase::Streaming;
        }
    }

    fn finish(&mut self, phase: SessionPhase) -> Option<Change> {
        debug!("Session {} -> {}", self.phase, phase);
        self.phase = phase;
        Some(Change::Finished)
    }
}
