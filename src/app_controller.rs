use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, PersistenceBackend};
use crate::file_utils::FileManager;
use crate::language_utils::LanguageCatalog;
use crate::persistence::{HttpRecordStore, PageQuery, Record, RecordId, RecordPage, RecordStore, SqliteRecordStore};
use crate::protocol::Stage;
use crate::session::{
    SessionClient, SessionObserver, SessionPhase, SessionReport, TransformRequest,
};
use crate::transport::{Handshake, HttpTransport, StreamOpener};

// @module: Application controller wiring config, session client and record store

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Service transport, also used for the language catalog
    transport: Arc<HttpTransport>,
    // @field: Record store, absent when persistence is disabled
    store: Option<Arc<dyn RecordStore>>,
    client: SessionClient,
}

impl Controller {
    // @method: Create a controller talking to the configured service
    pub fn with_config(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::from_config(&config.server));
        let store = Self::build_store(&config)?;
        Ok(Self::with_parts(
            config,
            transport.clone(),
            transport.clone(),
            transport,
            store,
        ))
    }

    /// Create a controller from explicit collaborators
    pub fn with_parts(
        config: Config,
        handshake: Arc<dyn Handshake>,
        opener: Arc<dyn StreamOpener>,
        transport: Arc<HttpTransport>,
        store: Option<Arc<dyn RecordStore>>,
    ) -> Self {
        let timeout = Duration::from_secs(config.session.timeout_secs);
        let mut client = SessionClient::new(handshake, opener, timeout);
        if let Some(store) = &store {
            client = client.with_store(store.clone(), config.persistence.user_id.clone());
        }

        Self {
            config,
            transport,
            store,
            client,
        }
    }

    fn build_store(config: &Config) -> Result<Option<Arc<dyn RecordStore>>> {
        let persistence = &config.persistence;
        let store: Option<Arc<dyn RecordStore>> = match persistence.backend {
            PersistenceBackend::Remote => Some(Arc::new(HttpRecordStore::new(
                persistence.endpoint.clone(),
                Duration::from_secs(persistence.request_timeout_secs),
            ))),
            PersistenceBackend::Local => {
                let store = match &persistence.database_path {
                    Some(path) => SqliteRecordStore::open(path),
                    None => SqliteRecordStore::open_default(),
                }
                .context("Failed to open the local record database")?;
                Some(Arc::new(store))
            }
            PersistenceBackend::Disabled => None,
        };
        debug!("Record store backend: {}", persistence.backend);
        Ok(store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Session client, e.g. to cancel the running session
    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Transform the text at `input` according to `requirements`
    ///
    /// The final snapshot is written to `output` when given and the session succeeded.
    pub async fn modify(&self, input: &Path, requirements: &str, output: Option<&Path>) -> Result<SessionReport> {
        let source_text = FileManager::read_input(input)?;
        let request = TransformRequest::new(
            source_text,
            requirements,
            self.config.source_language.clone(),
            self.config.target_language.clone(),
        );
        info!(
            "Submitting {} characters ({} -> {})",
            request.source_text().chars().count(),
            request.source_language(),
            request.target_language()
        );

        let observer = ProgressObserver::new();
        let report = self.client.run(request, &observer).await;

        if let (Some(output), Some(text)) = (output, report.output()) {
            FileManager::write_to_file(output, text)?;
            info!("Result written to {:?}", output);
        }

        Ok(report)
    }

    fn require_store(&self) -> Result<&Arc<dyn RecordStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| anyhow!("Record history is disabled (persistence.backend = disabled)"))
    }

    /// One page of saved records
    pub async fn list_history(&self, query: PageQuery) -> Result<RecordPage> {
        let store = self.require_store()?;
        Ok(store.list(query).await?)
    }

    /// A saved record
    pub async fn show_record(&self, id: RecordId) -> Result<Record> {
        let store = self.require_store()?;
        store
            .get(id)
            .await?
            .ok_or_else(|| crate::errors::PersistenceError::NotFound(id).into())
    }

    /// Delete a saved record
    pub async fn delete_record(&self, id: RecordId) -> Result<()> {
        let store = self.require_store()?;
        if store.delete(id).await? {
            info!("Deleted record {}", id);
            Ok(())
        } else {
            warn!("Record {} was not deleted", id);
            Err(crate::errors::PersistenceError::NotFound(id).into())
        }
    }

    /// Language catalog of the service, or the built-in one
    pub async fn languages(&self) -> LanguageCatalog {
        LanguageCatalog::fetch(&self.transport, &self.config.server.language_path).await
    }
}

/// Renders session progress as a spinner
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg} ({pos} chars)")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message("starting");
        Self { bar }
    }
}

impl SessionObserver for ProgressObserver {
    fn on_status(&self, stage: Stage, status: &str) {
        self.bar.set_message(format!(
            "[{}/{}] {}",
            stage.index(),
            Stage::Complete.index(),
            status
        ));
    }

    fn on_snapshot(&self, snapshot: &str) {
        self.bar.set_position(snapshot.chars().count() as u64);
    }

    fn on_finished(&self, phase: &SessionPhase) {
        match phase {
            SessionPhase::Succeeded => self.bar.finish_with_message("done"),
            other => self.bar.abandon_with_message(other.to_string()),
        }
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        // Abandoned sessions end without notifying the observer
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
