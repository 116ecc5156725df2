//! DuckDuckGo image search over its JSON endpoint
//!
//! Every request needs a `vqd` token that DuckDuckGo embeds in the HTML of
//! its search page. The token is fetched once per session and kept in the
//! cursor. Failures propagate to the caller.

use super::{ImageProvider, PageCursor, SearchQuery};
use crate::client::check_status;
use crate::error::ImgdlError;
use async_trait::async_trait;
use imgdl_types::{ResultItem, Settings};
use regex::Regex;
use reqwest::header::REFERER;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://duckduckgo.com";

/// Upper bound on results served per session
pub const MAX_RESULTS: usize = 500;

#[derive(Debug, Deserialize)]
struct ImagePage {
    #[serde(default)]
    results: Vec<ImageHit>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageHit {
    #[serde(default)]
    image: String,
    thumbnail: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

impl From<ImageHit> for ResultItem {
    fn from(hit: ImageHit) -> Self {
        Self {
            thumbnail_url: hit.thumbnail.unwrap_or_else(|| hit.image.clone()),
            image_url: hit.image,
            title: hit.title,
            source_label: hit.source,
            page_url: hit.url,
            width: hit.width,
            height: hit.height,
        }
    }
}

/// Provider backed by DuckDuckGo's `i.js` endpoint
#[derive(Debug, Clone)]
pub struct DuckDuckGoProvider {
    client: Client,
    base_url: String,
    region: String,
    safe_search: bool,
    max_results: usize,
}

impl DuckDuckGoProvider {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            region: settings.region.clone(),
            safe_search: settings.safe_search,
            max_results: MAX_RESULTS,
        }
    }

    /// Point the provider at another host (used against mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    async fn fetch_vqd(&self, keywords: &str) -> Result<String, ImgdlError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("q", keywords)])
            .send()
            .await
            .map_err(provider_error)?;
        let html = check_status(response)
            .map_err(status_error)?
            .text()
            .await
            .map_err(provider_error)?;

        extract_vqd(&html)
            .ok_or_else(|| ImgdlError::Provider(format!("no vqd token for query {:?}", keywords)))
    }

    fn filter_param(query: &SearchQuery) -> String {
        match query.filter {
            Some(filter) => format!(",size:{},,,,", filter),
            None => ",,,,,".to_string(),
        }
    }
}

#[async_trait]
impl ImageProvider for DuckDuckGoProvider {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn fetch_page(
        &self,
        query: &SearchQuery,
        cursor: &mut PageCursor,
    ) -> Result<Vec<ResultItem>, ImgdlError> {
        if cursor.exhausted || cursor.fetched >= self.max_results {
            cursor.exhausted = true;
            return Ok(Vec::new());
        }

        let vqd = match &cursor.token {
            Some(token) => token.clone(),
            None => {
                let token = self.fetch_vqd(&query.text).await?;
                cursor.token = Some(token.clone());
                token
            }
        };

        let safe_search = if self.safe_search { "1" } else { "-1" };
        let mut params = vec![
            ("l", self.region.clone()),
            ("o", "json".to_string()),
            ("q", query.text.clone()),
            ("vqd", vqd),
            ("f", Self::filter_param(query)),
            ("p", safe_search.to_string()),
        ];
        if cursor.offset > 0 {
            params.push(("s", cursor.offset.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/i.js", self.base_url))
            .header(REFERER, format!("{}/", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(provider_error)?;
        let page: ImagePage = check_status(response)
            .map_err(status_error)?
            .json()
            .await
            .map_err(provider_error)?;

        let remaining = self.max_results - cursor.fetched;
        let items: Vec<ResultItem> = page
            .results
            .into_iter()
            .filter(|hit| !hit.image.is_empty())
            .take(remaining)
            .map(ResultItem::from)
            .collect();
        cursor.fetched += items.len();

        match page.next.as_deref().and_then(next_offset) {
            Some(offset) if offset > cursor.offset => cursor.offset = offset,
            _ => {
                debug!(query = %query.text, fetched = cursor.fetched, "duckduckgo has no further pages");
                cursor.exhausted = true;
            }
        }

        Ok(items)
    }
}

fn provider_error(error: reqwest::Error) -> ImgdlError {
    ImgdlError::Provider(format!("duckduckgo: {}", error))
}

fn status_error(error: ImgdlError) -> ImgdlError {
    ImgdlError::Provider(format!("duckduckgo: {}", error))
}

/// Pull the `vqd` token out of the search page HTML
pub(crate) fn extract_vqd(html: &str) -> Option<String> {
    static VQD: OnceLock<Regex> = OnceLock::new();
    let re = VQD.get_or_init(|| {
        Regex::new(r#"vqd\s*[=:]\s*["']?([0-9-]+)"#).expect("vqd pattern is valid")
    });
    re.captures(html).map(|caps| caps[1].to_string())
}

/// Read the `s` parameter of a `next` link such as `i.js?q=cats&s=100`
pub(crate) fn next_offset(next: &str) -> Option<usize> {
    let query = next.split_once('?').map(|(_, q)| q).unwrap_or(next);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "s")
        .and_then(|(_, value)| value.parse().ok())
}
