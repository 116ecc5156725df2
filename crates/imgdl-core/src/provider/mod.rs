//! Image search providers
//!
//! A provider turns a query plus cursor state into the next page of
//! results. Sessions own the cursor, so providers stay stateless and can
//! be shared across every session.

mod bing;
mod duckduckgo;

pub use bing::BingProvider;
pub use duckduckgo::DuckDuckGoProvider;

use crate::error::ImgdlError;
use async_trait::async_trait;
use imgdl_types::{ProviderKind, ResultItem, Settings, SizeFilter, SizeHint};
use reqwest::Client;
use std::sync::Arc;

/// Query as sent to a provider, after size-hint rewriting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub filter: Option<SizeFilter>,
}

impl SearchQuery {
    /// `2k`/`4k`/`8k` turn `cats` into `cats 4k wallpaper` with the
    /// wallpaper filter; other hints only set the filter.
    pub fn new(query: &str, size: SizeHint) -> Self {
        let query = query.trim();
        let text = match size.resolution_keyword() {
            Some(keyword) => format!("{} {} wallpaper", query, keyword),
            None => query.to_string(),
        };

        Self {
            text,
            filter: size.provider_filter(),
        }
    }
}

/// Pagination state a provider reads and advances
#[derive(Debug, Clone, Default)]
pub struct PageCursor {
    /// Provider-specific offset for the next request
    pub offset: usize,
    /// Items handed out so far
    pub fetched: usize,
    /// Opaque provider token (e.g. a DuckDuckGo `vqd`)
    pub token: Option<String>,
    /// No further pages will be requested once set
    pub exhausted: bool,
}

/// Source of paged image results
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fetch the page after `cursor`, advancing it.
    ///
    /// An empty page, or `cursor.exhausted`, signals the end of results.
    async fn fetch_page(
        &self,
        query: &SearchQuery,
        cursor: &mut PageCursor,
    ) -> Result<Vec<ResultItem>, ImgdlError>;
}

/// Build the provider selected in `settings`
pub fn build_provider(client: Client, settings: &Settings) -> Arc<dyn ImageProvider> {
    match settings.provider {
        ProviderKind::DuckDuckGo => Arc::new(DuckDuckGoProvider::new(client, settings)),
        ProviderKind::Bing => Arc::new(BingProvider::new(client, settings)),
    }
}
