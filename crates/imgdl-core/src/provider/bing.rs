//! Bing image search scraped from the `images/async` HTML fragment
//!
//! Failures are lenient: a request or parse error ends pagination for the
//! session instead of failing the call. They are logged at `warn` so they
//! can be told apart from a genuine end of results.

use super::{ImageProvider, PageCursor, SearchQuery};
use crate::client::check_status;
use crate::error::ImgdlError;
use async_trait::async_trait;
use imgdl_types::{ResultItem, Settings, SizeFilter};
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://www.bing.com";

/// Links requested per page
const PAGE_SIZE: usize = 35;

/// Absolute offset after which pagination stops
pub const OFFSET_CEILING: usize = 1000;

const SOURCE_LABEL: &str = "Bing";

/// Provider that scrapes Bing's image result markup
#[derive(Debug, Clone)]
pub struct BingProvider {
    client: Client,
    base_url: String,
    safe_search: bool,
    offset_ceiling: usize,
}

impl BingProvider {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            safe_search: settings.safe_search,
            offset_ceiling: OFFSET_CEILING,
        }
    }

    /// Point the provider at another host (used against mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_offset_ceiling(mut self, offset_ceiling: usize) -> Self {
        self.offset_ceiling = offset_ceiling;
        self
    }

    async fn scrape(&self, query: &SearchQuery, offset: usize) -> Result<Vec<String>, ImgdlError> {
        let adult = if self.safe_search { "moderate" } else { "off" };
        let mut params = vec![
            ("q", query.text.clone()),
            ("first", offset.to_string()),
            ("count", PAGE_SIZE.to_string()),
            ("adlt", adult.to_string()),
        ];
        if let Some(filter) = query.filter {
            params.push(("qft", size_filter(filter).to_string()));
        }

        let response = self
            .client
            .get(format!("{}/images/async", self.base_url))
            .query(&params)
            .send()
            .await?;
        let html = check_status(response)?.text().await?;

        Ok(extract_image_links(&html))
    }
}

#[async_trait]
impl ImageProvider for BingProvider {
    fn name(&self) -> &'static str {
        "bing"
    }

    async fn fetch_page(
        &self,
        query: &SearchQuery,
        cursor: &mut PageCursor,
    ) -> Result<Vec<ResultItem>, ImgdlError> {
        if cursor.exhausted {
            return Ok(Vec::new());
        }
        if cursor.offset >= self.offset_ceiling {
            debug!(query = %query.text, offset = cursor.offset, "bing offset ceiling reached");
            cursor.exhausted = true;
            return Ok(Vec::new());
        }

        let links = match self.scrape(query, cursor.offset).await {
            Ok(links) => links,
            Err(e) => {
                warn!(
                    query = %query.text,
                    offset = cursor.offset,
                    error = %e,
                    "bing scrape failed, treating as end of results"
                );
                cursor.exhausted = true;
                return Ok(Vec::new());
            }
        };

        if links.is_empty() {
            debug!(query = %query.text, offset = cursor.offset, "bing returned no more links");
            cursor.exhausted = true;
            return Ok(Vec::new());
        }

        cursor.offset += links.len();
        cursor.fetched += links.len();

        Ok(links
            .into_iter()
            .map(|link| ResultItem::from_image_url(link, SOURCE_LABEL))
            .collect())
    }
}

fn size_filter(filter: SizeFilter) -> &'static str {
    match filter {
        SizeFilter::Small => "+filterui:imagesize-small",
        SizeFilter::Medium => "+filterui:imagesize-medium",
        SizeFilter::Large => "+filterui:imagesize-large",
        SizeFilter::Wallpaper => "+filterui:imagesize-wallpaper",
    }
}

/// Collect full-size image URLs (`murl`) from result markup
pub(crate) fn extract_image_links(html: &str) -> Vec<String> {
    static MURL: OnceLock<Regex> = OnceLock::new();
    let re = MURL.get_or_init(|| {
        Regex::new(r"murl&quot;:&quot;(.*?)&quot;").expect("murl pattern is valid")
    });

    re.captures_iter(html)
        .map(|caps| caps[1].replace("&amp;", "&"))
        .filter(|link| !link.is_empty())
        .collect()
}
