//! Pass-through streaming of a single remote image

use crate::client::check_status;
use crate::error::ImgdlError;
use crate::filename::proxy_filename;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::info;

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// An upstream response ready to be relayed to the client
pub struct ProxiedResource {
    pub content_type: String,
    /// Name suggested in `Content-Disposition`
    pub filename: String,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, ImgdlError>>,
}

impl std::fmt::Debug for ProxiedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxiedResource")
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Streams remote resources through the server without buffering them
#[derive(Debug, Clone)]
pub struct ProxyStreamer {
    client: Client,
}

impl ProxyStreamer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Open `url` and hand back its body as a stream.
    ///
    /// Transport failures and non-2xx statuses fail the whole call.
    pub async fn stream(&self, url: &str) -> Result<ProxiedResource, ImgdlError> {
        let parsed = url::Url::parse(url).map_err(|_| ImgdlError::InvalidUrl(url.to_string()))?;

        let response = check_status(self.client.get(parsed).send().await?)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let content_length = response.content_length();
        let filename = proxy_filename(url);

        info!(url = %url, content_type = %content_type, filename = %filename, "proxying image");

        Ok(ProxiedResource {
            content_type,
            filename,
            content_length,
            body: response.bytes_stream().map_err(ImgdlError::from).boxed(),
        })
    }
}
