//! Shared types for imgdl
//!
//! This crate contains the data structures shared between the core
//! engine and the HTTP server / CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Search Types
// ============================================================================

/// A single image search hit, as returned to the front end.
///
/// Field names on the wire follow what the browser UI already consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(rename = "image")]
    pub image_url: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    pub title: String,
    #[serde(rename = "source")]
    pub source_label: String,
    #[serde(rename = "url")]
    pub page_url: String,
    pub width: u32,
    pub height: u32,
}

impl ResultItem {
    /// Build an item when only the image URL is known.
    ///
    /// The thumbnail falls back to the full image and dimensions are 0.
    pub fn from_image_url(image_url: String, source_label: &str) -> Self {
        Self {
            thumbnail_url: image_url.clone(),
            image_url,
            title: String::new(),
            source_label: source_label.to_string(),
            page_url: String::new(),
            width: 0,
            height: 0,
        }
    }
}

/// Size filter requested by the client.
///
/// `2k`/`4k`/`8k` are not provider filters; they rewrite the query and
/// select the wallpaper filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeHint {
    #[default]
    Any,
    Small,
    Medium,
    Large,
    Wallpaper,
    #[serde(rename = "2k")]
    Res2k,
    #[serde(rename = "4k")]
    Res4k,
    #[serde(rename = "8k")]
    Res8k,
}

impl SizeHint {
    /// Resolution keyword appended to the query, if any
    pub fn resolution_keyword(&self) -> Option<&'static str> {
        match self {
            SizeHint::Res2k => Some("2k"),
            SizeHint::Res4k => Some("4k"),
            SizeHint::Res8k => Some("8k"),
            _ => None,
        }
    }

    /// Filter the provider should apply after query rewriting
    pub fn provider_filter(&self) -> Option<SizeFilter> {
        match self {
            SizeHint::Any => None,
            SizeHint::Small => Some(SizeFilter::Small),
            SizeHint::Medium => Some(SizeFilter::Medium),
            SizeHint::Large => Some(SizeFilter::Large),
            SizeHint::Wallpaper | SizeHint::Res2k | SizeHint::Res4k | SizeHint::Res8k => {
                Some(SizeFilter::Wallpaper)
            }
        }
    }
}

impl FromStr for SizeHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Ok(SizeHint::Any),
            "small" => Ok(SizeHint::Small),
            "medium" => Ok(SizeHint::Medium),
            "large" => Ok(SizeHint::Large),
            "wallpaper" => Ok(SizeHint::Wallpaper),
            "2k" => Ok(SizeHint::Res2k),
            "4k" => Ok(SizeHint::Res4k),
            "8k" => Ok(SizeHint::Res8k),
            other => Err(format!("Invalid size: {}", other)),
        }
    }
}

/// Size filter understood by the search providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeFilter {
    Small,
    Medium,
    Large,
    Wallpaper,
}

impl fmt::Display for SizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeFilter::Small => "Small",
            SizeFilter::Medium => "Medium",
            SizeFilter::Large => "Large",
            SizeFilter::Wallpaper => "Wallpaper",
        };
        f.write_str(name)
    }
}

/// Which search backend feeds the sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// DuckDuckGo JSON image API
    #[default]
    DuckDuckGo,
    /// Bing image results scraped from HTML
    Bing,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(ProviderKind::DuckDuckGo),
            "bing" => Ok(ProviderKind::Bing),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::DuckDuckGo => f.write_str("duckduckgo"),
            ProviderKind::Bing => f.write_str("bing"),
        }
    }
}

// ============================================================================
// Download Types
// ============================================================================

/// Outcome of a single bulk-download attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Result of downloading one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub url: String,
    pub status: OutcomeStatus,
    #[serde(rename = "path", skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<PathBuf>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DownloadOutcome {
    pub fn success(url: String, saved_path: PathBuf) -> Self {
        Self {
            url,
            status: OutcomeStatus::Success,
            saved_path: Some(saved_path),
            error_message: None,
        }
    }

    pub fn error(url: String, message: String) -> Self {
        Self {
            url,
            status: OutcomeStatus::Error,
            saved_path: None,
            error_message: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

// ============================================================================
// Settings Types
// ============================================================================

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Where bulk downloads are written, created on startup if absent
    pub download_dir: PathBuf,
    pub provider: ProviderKind,
    /// Items returned per search/more call
    pub batch_size: usize,
    pub max_concurrent_downloads: usize,
    /// Timeout applied to every outbound fetch
    pub fetch_timeout_secs: u64,
    /// Maximum number of live search sessions
    pub session_capacity: u64,
    /// Sessions untouched for this long are dropped
    pub session_idle_secs: u64,
    /// DuckDuckGo region code
    pub region: String,
    pub safe_search: bool,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            download_dir: PathBuf::from("downloads"),
            provider: ProviderKind::DuckDuckGo,
            batch_size: 30,
            max_concurrent_downloads: 5,
            fetch_timeout_secs: 15,
            session_capacity: 1000,
            session_idle_secs: 30 * 60,
            region: "wt-wt".to_string(),
            safe_search: false,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

/// Query string of `GET /api/search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub size: String,
}

/// Response of `GET /api/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<ResultItem>,
    pub session_id: String,
}

/// Query string of `GET /api/more`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoreParams {
    pub session_id: Option<String>,
}

/// Response of `GET /api/more`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoreResponse {
    pub results: Vec<ResultItem>,
}

/// Query string of `GET /api/proxy_download`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

/// Body of `POST /api/download`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Response of `POST /api/download`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub results: Vec<DownloadOutcome>,
}

/// Error envelope used by the JSON endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
