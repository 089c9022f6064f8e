use log::{info, warn};
use std::sync::Arc;

use crate::errors::{SessionError, TransportError};
use crate::transport::Handshake;
use super::classifier::{classify, RawFailure};
use super::models::{SessionId, TransformRequest};

/// Performs the handshake that creates a job
///
/// A failed handshake yields a `Handshake` error and no session id, so no
/// stream may be opened for it.
#[derive(Clone)]
pub struct SessionInitiator {
    handshake: Arc<dyn Handshake>,
}

impl SessionInitiator {
    pub fn new(handshake: Arc<dyn Handshake>) -> Self {
        Self { handshake }
    }

    /// Start a job and return its session id
    pub async fn start(&self, request: &TransformRequest) -> Result<SessionId, SessionError> {
        match self.handshake.start(request).await {
            Ok(session_id) if !session_id.as_str().trim().is_empty() => {
                info!("Job started with session {}", session_id);
                Ok(session_id)
            }
            Ok(_) => {
                warn!("Handshake returned an empty session id");
                Err(classify(&RawFailure::Handshake(TransportError::Decode(
                    "response carried an empty session id".to_string(),
                ))))
            }
            Err(cause) => {
                warn!("Handshake failed: {}", cause);
                Err(classify(&RawFailure::Handshake(cause)))
            }
        }
    }
}
