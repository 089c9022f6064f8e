/*!
 * Streaming session protocol and its client-side state machine.
 *
 * This module provides:
 * - `SessionInitiator`: the handshake that creates a job
 * - `StreamConnector`: one event-stream connection, its deadline and close
 * - `StageTracker` / `ResultBuffer`: progress and latest output snapshot
 * - `classify`: mapping of raw failures onto the error taxonomy
 * - `SessionClient`: at most one active session per client
 */

pub mod buffer;
pub mod cancel;
pub mod classifier;
pub mod client;
pub mod connector;
pub mod dispatch;
pub mod initiator;
pub mod models;
pub mod observer;
pub mod tracker;

// Re-export main types
pub use buffer::ResultBuffer;
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use classifier::{classify, RawFailure};
pub use client::{PersistenceStatus, SessionClient, SessionReport};
pub use connector::{ConnectorExit, StreamConnector};
pub use dispatch::{dispatch, Change, InboundSignal, StageDetail, Transition};
pub use initiator::SessionInitiator;
pub use models::{SessionId, SessionPhase, SessionState, TransformRequest};
pub use observer::{NoopObserver, SessionObserver};
pub use tracker::StageTracker;
