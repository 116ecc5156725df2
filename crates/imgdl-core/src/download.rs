//! Bulk image downloads
//!
//! Key principles:
//! - Bounded fan-out; outcomes come back in input order
//! - One failed URL never aborts the rest of the batch
//! - Response bodies are streamed to disk chunk by chunk
//! - Target files are reserved with `create_new`, so concurrent downloads
//!   of the same name always land in distinct files

use crate::client::check_status;
use crate::error::ImgdlError;
use crate::filename::{download_filename, split_extension};
use futures::stream::{self, StreamExt};
use imgdl_types::DownloadOutcome;
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Upper bound on collision suffixes tried for one name
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Downloads lists of URLs into a directory
#[derive(Debug, Clone)]
pub struct DownloadDispatcher {
    client: Client,
    download_dir: PathBuf,
    concurrency: usize,
}

impl DownloadDispatcher {
    pub fn new(client: Client, download_dir: PathBuf, concurrency: usize) -> Self {
        Self {
            client,
            download_dir,
            concurrency: concurrency.max(1),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Download every URL, at most `concurrency` at a time.
    ///
    /// The returned outcomes line up with `urls` index for index.
    pub async fn download_all(&self, urls: &[String]) -> Vec<DownloadOutcome> {
        info!(count = urls.len(), concurrency = self.concurrency, "starting bulk download");

        let outcomes: Vec<DownloadOutcome> = stream::iter(urls.iter().cloned())
            .map(|url| self.download_one(url))
            .buffered(self.concurrency)
            .collect()
            .await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            succeeded,
            failed = outcomes.len() - succeeded,
            "bulk download finished"
        );

        outcomes
    }

    async fn download_one(&self, url: String) -> DownloadOutcome {
        match self.fetch_to_file(&url).await {
            Ok(path) => {
                debug!(url = %url, path = %path.display(), "image saved");
                DownloadOutcome::success(url, path)
            }
            Err(e) => {
                warn!(url = %url, error = %e, timeout = e.is_timeout(), "image download failed");
                DownloadOutcome::error(url, e.transfer_message())
            }
        }
    }

    async fn fetch_to_file(&self, url: &str) -> Result<PathBuf, ImgdlError> {
        let filename = download_filename(url);
        let (path, mut file) = reserve_unique_path(&self.download_dir, &filename).await?;

        match self.write_body(url, &mut file).await {
            Ok(()) => Ok(path),
            Err(e) => {
                drop(file);
                if let Err(remove_err) = fs::remove_file(&path).await {
                    debug!(path = %path.display(), error = %remove_err, "could not remove partial file");
                }
                Err(e)
            }
        }
    }

    async fn write_body(&self, url: &str, file: &mut File) -> Result<(), ImgdlError> {
        let response = check_status(self.client.get(url).send().await?)?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }

        file.flush().await?;
        Ok(())
    }
}

/// Create `filename` in `dir`, or `<stem>_<n><ext>` if it is taken.
pub(crate) async fn reserve_unique_path(dir: &Path, filename: &str) -> io::Result<(PathBuf, File)> {
    let (stem, extension) = split_extension(filename);
    let mut candidate = dir.join(filename);
    let mut counter = 1;

    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && counter <= MAX_COLLISION_SUFFIX => {
                candidate = dir.join(format!("{}_{}{}", stem, counter, extension));
                counter += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
