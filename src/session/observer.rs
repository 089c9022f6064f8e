use crate::protocol::Stage;
use super::models::SessionPhase;

/// Receives progress of a running session
///
/// Every method defaults to a no-op so front-ends only implement what they render.
pub trait SessionObserver: Send + Sync {
    /// Stage or status line changed
    fn on_status(&self, _stage: Stage, _status: &str) {}

    /// A new full output snapshot arrived
    fn on_snapshot(&self, _snapshot: &str) {}

    /// The session reached a terminal phase
    fn on_finished(&self, _phase: &SessionPhase) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
