/*!
 * Transport seams of the session protocol.
 *
 * The session core only talks to these traits:
 * - `Handshake`: the one-shot request that creates a job
 * - `StreamOpener`: opens the event stream of a created job
 * - `EventSource`: one open event-stream connection
 *
 * `http` holds the reqwest-backed implementation used by the binary;
 * tests substitute scripted implementations.
 */

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::protocol::SseFrame;
use crate::session::{SessionId, TransformRequest};

/// Creates a job and returns its session id
#[async_trait]
pub trait Handshake: Send + Sync {
    /// Perform the handshake round trip
    ///
    /// # Arguments
    /// * `request` - The immutable job input
    ///
    /// # Returns
    /// * `Result<SessionId, TransportError>` - The issued session id or the failure
    async fn start(&self, request: &TransformRequest) -> Result<SessionId, TransportError>;
}

/// Opens the event stream of a session
#[async_trait]
pub trait StreamOpener: Send + Sync {
    async fn open(&self, session_id: &SessionId) -> Result<Box<dyn EventSource>, TransportError>;
}

/// One open event-stream connection
#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next frame
    ///
    /// Returns `None` once the stream has ended or the source was closed.
    async fn next_frame(&mut self) -> Option<Result<SseFrame, TransportError>>;

    /// Close the connection; later frames are never delivered
    fn close(&mut self);
}

pub mod http;

pub use http::{HttpEventSource, HttpTransport};
