/*!
 * Session data model.
 *
 * A session is one attempt to transform one input. Its request is captured
 * once and never changes; its mutable state is a single tagged phase plus
 * the stage tracker and result buffer it exclusively owns.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{ErrorKind, SessionError};
use super::buffer::ResultBuffer;
use super::classifier::ABANDONED_MESSAGE;
use super::tracker::StageTracker;

/// Opaque job identifier issued by the handshake
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable input of a transformation job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    source_text: String,
    instructions: String,
    source_language: String,
    target_language: String,
}

impl TransformRequest {
    /// Capture a request; language tags are passed through unmodified
    pub fn new(
        source_text: impl Into<String>,
        instructions: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            instructions: instructions.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }
}

/// Lifecycle phase of a session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Initializing,
    Streaming,
    Succeeded,
    Failed(SessionError),
    TimedOut(SessionError),
    Rejected(SessionError),
}

impl SessionPhase {
    /// Terminal phases accept no further events
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Initializing | Self::Streaming)
    }

    /// The structured error of a failed, timed-out or rejected session
    pub fn error(&self) -> Option<&SessionError> {
        match self {
            Self::Failed(e) | Self::TimedOut(e) | Self::Rejected(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the caller abandoned the session before the server finished it
    pub fn is_abandoned(&self) -> bool {
        matches!(
            self,
            Self::Failed(e) if e.kind == ErrorKind::Connection && e.message == ABANDONED_MESSAGE
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Streaming => "streaming",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::TimedOut(_) => "timed-out",
            Self::Rejected(_) => "rejected",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All mutable state of the active session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub(crate) phase: SessionPhase,
    pub(crate) tracker: StageTracker,
    pub(crate) buffer: ResultBuffer,
}

impl SessionState {
    /// Fresh state for a new session
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn tracker(&self) -> &StageTracker {
        &self.tracker
    }

    pub fn buffer(&self) -> &ResultBuffer {
        &self.buffer
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.phase.error()
    }
}
