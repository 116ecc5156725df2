//! imgdl Core - Search Sessions and Download Engine
//!
//! This crate pages image search results through per-client sessions,
//! bulk-downloads selected images and streams single images back to the
//! caller.

mod client;
mod download;
mod error;
mod filename;
mod proxy;
mod session;

pub mod provider;

pub use client::*;
pub use download::*;
pub use error::*;
pub use filename::*;
pub use proxy::*;
pub use session::*;

use imgdl_types::{DownloadOutcome, ResultItem, Settings, SizeHint};
use provider::{build_provider, ImageProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The main imgdl core instance
#[derive(Clone)]
pub struct ImgdlCore {
    /// Application settings
    settings: Arc<Settings>,
    /// Search sessions
    sessions: SessionStore,
    /// Bulk downloader
    downloads: DownloadDispatcher,
    /// Single-image streamer
    proxy: ProxyStreamer,
}

impl ImgdlCore {
    /// Create a core using the provider named in `settings`
    pub async fn new(settings: Settings) -> Result<Self, ImgdlError> {
        let client = build_client(&settings)?;
        let provider = build_provider(client.clone(), &settings);
        Self::assemble(settings, client, provider).await
    }

    /// Create a core around an explicit provider
    pub async fn with_provider(
        settings: Settings,
        provider: Arc<dyn ImageProvider>,
    ) -> Result<Self, ImgdlError> {
        let client = build_client(&settings)?;
        Self::assemble(settings, client, provider).await
    }

    async fn assemble(
        settings: Settings,
        client: reqwest::Client,
        provider: Arc<dyn ImageProvider>,
    ) -> Result<Self, ImgdlError> {
        // Ensure the download directory exists
        tokio::fs::create_dir_all(&settings.download_dir).await?;
        let download_dir = tokio::fs::canonicalize(&settings.download_dir).await?;
        info!(
            download_dir = %download_dir.display(),
            provider = provider.name(),
            "imgdl core initialized"
        );

        let sessions = SessionStore::new(
            provider,
            settings.session_capacity,
            Duration::from_secs(settings.session_idle_secs),
        );
        let downloads = DownloadDispatcher::new(
            client.clone(),
            download_dir,
            settings.max_concurrent_downloads,
        );
        let proxy = ProxyStreamer::new(client);

        Ok(Self {
            settings: Arc::new(settings),
            sessions,
            downloads,
            proxy,
        })
    }

    /// Get current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn downloads(&self) -> &DownloadDispatcher {
        &self.downloads
    }

    // ========================================================================
    // Search Operations
    // ========================================================================

    /// Start a search session and return its id with the first batch
    pub async fn search(
        &self,
        query: &str,
        size: &str,
    ) -> Result<(String, Vec<ResultItem>), ImgdlError> {
        if query.trim().is_empty() {
            return Err(ImgdlError::Validation("No query provided".to_string()));
        }
        let size: SizeHint = size.parse().map_err(ImgdlError::Validation)?;

        let session_id = self.sessions.create(query, size).await;
        match self
            .sessions
            .next_batch(&session_id, self.settings.batch_size)
            .await
        {
            Ok(results) => Ok((session_id, results)),
            Err(e) => {
                // A session whose first page failed is of no use to the client
                self.sessions.remove(&session_id).await;
                Err(e)
            }
        }
    }

    /// Next batch of results for an existing session
    pub async fn more(&self, session_id: &str) -> Result<Vec<ResultItem>, ImgdlError> {
        self.sessions
            .next_batch(session_id, self.settings.batch_size)
            .await
    }

    // ========================================================================
    // Download Operations
    // ========================================================================

    /// Download every URL into the download directory
    pub async fn download_all(&self, urls: &[String]) -> Result<Vec<DownloadOutcome>, ImgdlError> {
        if urls.is_empty() {
            return Err(ImgdlError::Validation("No URLs provided".to_string()));
        }
        Ok(self.downloads.download_all(urls).await)
    }

    /// Open a remote image for streaming back to the caller
    pub async fn proxy(&self, url: &str) -> Result<ProxiedResource, ImgdlError> {
        if url.trim().is_empty() {
            return Err(ImgdlError::Validation("No URL provided".to_string()));
        }
        self.proxy.stream(url).await
    }
}
