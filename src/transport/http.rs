use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, error};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use url::Url;

use crate::app_config::ServerConfig;
use crate::errors::TransportError;
use crate::protocol::{SseFrame, SseParser};
use crate::session::{SessionId, TransformRequest};
use super::{EventSource, Handshake, StreamOpener};

/// Placeholder replaced by the session id in the stream path
pub const SESSION_ID_PLACEHOLDER: &str = "{session_id}";

/// HTTP client for the transformation service
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Client for bounded request/response calls
    client: Client,
    /// Client for the event stream; no overall timeout, the session deadline governs it
    stream_client: Client,
    /// Base URL of the service
    endpoint: String,
    /// Path of the handshake call
    handshake_path: String,
    /// Path template of the event stream
    stream_path: String,
}

/// Handshake request body
#[derive(Debug, Serialize)]
struct HandshakeBody<'a> {
    resume_text: &'a str,
    requirements: &'a str,
    source_language: &'a str,
    target_language: &'a str,
}

/// Handshake response body
#[derive(Debug, Default, Deserialize)]
struct HandshakeResponse {
    #[serde(default, alias = "sessionId")]
    session_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpTransport {
    /// Create a new transport for the given service
    pub fn new(
        endpoint: impl Into<String>,
        handshake_path: impl Into<String>,
        stream_path: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            stream_client: Client::builder()
                .connect_timeout(request_timeout)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            handshake_path: handshake_path.into(),
            stream_path: stream_path.into(),
        }
    }

    /// Create a transport from the server section of the configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.handshake_path.clone(),
            config.stream_path.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Join the endpoint and a path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// URL of the event stream of a session
    ///
    /// The id fills the placeholder segment as one percent-encoded path segment.
    pub fn stream_url(&self, session_id: &SessionId) -> Result<String, TransportError> {
        let Some((prefix, suffix)) = self.stream_path.split_once(SESSION_ID_PLACEHOLDER) else {
            return Ok(self.url(&self.stream_path));
        };
        let mut url = Url::parse(&self.url(prefix))
            .map_err(|e| TransportError::RequestFailed(format!("Invalid stream URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::RequestFailed(format!("Endpoint {} cannot carry a path", self.endpoint))
            })?
            .pop_if_empty()
            .push(session_id.as_str())
            .extend(suffix.split('/').filter(|segment| !segment.is_empty()));
        Ok(url.into())
    }

    /// GET a JSON document from the service
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Handshake for HttpTransport {
    async fn start(&self, request: &TransformRequest) -> Result<SessionId, TransportError> {
        let url = self.url(&self.handshake_path);
        let body = HandshakeBody {
            resume_text: request.source_text(),
            requirements: request.instructions(),
            source_language: request.source_language(),
            target_language: request.target_language(),
        };

        debug!("Handshake POST {}", url);
        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<HandshakeResponse>(&text)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or(text);
            error!("Handshake rejected ({}): {}", status, message);
            return Err(TransportError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed: HandshakeResponse =
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;

        // The service reports some failures as a 2xx error envelope
        if parsed.status.as_deref() == Some("error") {
            return Err(TransportError::ApiError {
                status_code: status.as_u16(),
                message: parsed.message.unwrap_or_default(),
            });
        }

        parsed
            .session_id
            .filter(|id| !id.trim().is_empty())
            .map(SessionId::new)
            .ok_or_else(|| TransportError::Decode("response carried no session id".to_string()))
    }
}

#[async_trait]
impl StreamOpener for HttpTransport {
    async fn open(&self, session_id: &SessionId) -> Result<Box<dyn EventSource>, TransportError> {
        let url = self.stream_url(session_id)?;
        debug!("Opening event stream {}", url);

        let response = self
            .stream_client
            .get(&url)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::StreamDropped(e.to_string())))
            .boxed();
        Ok(Box::new(HttpEventSource::new(chunks)))
    }
}

/// Event source over a stream of body chunks
pub struct HttpEventSource {
    chunks: Option<BoxStream<'static, Result<Bytes, TransportError>>>,
    parser: SseParser,
    pending: VecDeque<SseFrame>,
}

impl HttpEventSource {
    pub fn new(chunks: BoxStream<'static, Result<Bytes, TransportError>>) -> Self {
        Self {
            chunks: Some(chunks),
            parser: SseParser::new(),
            pending: VecDeque::new(),
        }
    }

    /// Whether the underlying body is still attached
    pub fn is_open(&self) -> bool {
        self.chunks.is_some()
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn next_frame(&mut self) -> Option<Result<SseFrame, TransportError>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(Ok(frame));
            }

            let chunks = self.chunks.as_mut()?;
            match chunks.next().await {
                Some(Ok(chunk)) => {
                    let frames = self.parser.feed(&chunk);
                    self.pending.extend(frames);
                }
                Some(Err(e)) => {
                    self.chunks = None;
                    return Some(Err(e));
                }
                None => {
                    self.chunks = None;
                    return self.parser.finish().map(Ok);
                }
            }
        }
    }

    fn close(&mut self) {
        self.chunks = None;
        self.pending.clear();
    }
}
