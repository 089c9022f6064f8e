use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::PersistenceError;
use super::models::{NewRecord, PageQuery, Record, RecordId, RecordPage};
use super::RecordStore;

/// Response envelope of the record service
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn rejection(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "no message".to_string())
    }
}

/// Client of the remote record service
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: Client,
    endpoint: String,
}

impl HttpRecordStore {
    /// Create a client for the service rooted at `endpoint`
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    async fn envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, PersistenceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Record service returned {}: {}", status, body);
            return Err(PersistenceError::RequestFailed(format!("{} - {}", status, body)));
        }
        response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| PersistenceError::RequestFailed(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn create(&self, record: NewRecord) -> Result<RecordId, PersistenceError> {
        debug!(
            "Saving record: original={} chars, modified={} chars",
            record.original_content.len(),
            record.modified_content.len()
        );
        let response = self.client.post(self.url("resume")).json(&record).send().await?;
        let envelope: Envelope<Record> = Self::envelope(response).await?;

        if !envelope.success {
            return Err(PersistenceError::Rejected(envelope.rejection()));
        }
        envelope
            .data
            .map(|saved| saved.id)
            .ok_or_else(|| PersistenceError::Rejected("saved record carried no id".to_string()))
    }

    async fn list(&self, query: PageQuery) -> Result<RecordPage, PersistenceError> {
        let query = query.normalized();
        let mut params = vec![
            ("current", query.current.to_string()),
            ("size", query.size.to_string()),
        ];
        if let Some(user_id) = &query.user_id {
            params.push(("userId", user_id.clone()));
        }

        let response = self
            .client
            .get(self.url("resume/page"))
            .query(&params)
            .send()
            .await?;
        let envelope: Envelope<RecordPage> = Self::envelope(response).await?;

        if !envelope.success {
            return Err(PersistenceError::Rejected(envelope.rejection()));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record>, PersistenceError> {
        let response = self
            .client
            .get(self.url(&format!("resume/{}", id)))
            .send()
            .await?;
        let envelope: Envelope<Record> = Self::envelope(response).await?;

        // The service answers a missing id with success=false
        if !envelope.success {
            debug!("Record {} not found: {}", id, envelope.rejection());
            return Ok(None);
        }
        Ok(envelope.data)
    }

    async fn delete(&self, id: RecordId) -> Result<bool, PersistenceError> {
        let response = self
            .client
            .delete(self.url(&format!("resume/{}", id)))
            .send()
            .await?;
        let envelope: Envelope<serde_json::Value> = Self::envelope(response).await?;

        if !envelope.success {
            warn!("Record {} was not deleted: {}", id, envelope.rejection());
        }
        Ok(envelope.success)
    }
}
