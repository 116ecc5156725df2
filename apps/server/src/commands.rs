//! One-shot CLI commands

use crate::output::{format_dimensions, print_output};
use crate::OutputFormat;
use anyhow::Result;
use console::style;
use imgdl_core::ImgdlCore;
use imgdl_types::{DownloadResponse, ResultItem, SearchResponse};

// ============================================================================
// Search
// ============================================================================

pub async fn search(
    core: &ImgdlCore,
    query: &str,
    size: &str,
    pages: usize,
    format: OutputFormat,
) -> Result<()> {
    let (session_id, mut results) = core.search(query, size).await?;

    for _ in 1..pages {
        let batch = core.more(&session_id).await?;
        if batch.is_empty() {
            break;
        }
        results.extend(batch);
    }

    let response = SearchResponse {
        results,
        session_id,
    };
    print_output(&response, format, |response| {
        if response.results.is_empty() {
            println!("{} No results for {}", style("!").yellow().bold(), style(query).cyan());
            return;
        }
        for (index, item) in response.results.iter().enumerate() {
            print_item(index + 1, item);
        }
        println!(
            "\n{} {} results (session {})",
            style("✓").green().bold(),
            response.results.len(),
            style(&response.session_id).dim()
        );
    })
}

fn print_item(index: usize, item: &ResultItem) {
    let title = if item.title.is_empty() {
        &item.image_url
    } else {
        &item.title
    };
    println!(
        "{:>4}. {} [{}]",
        index,
        style(title).bold(),
        format_dimensions(item.width, item.height)
    );
    println!("      {}", style(&item.image_url).cyan());
}

// ============================================================================
// Download
// ============================================================================

pub async fn download(core: &ImgdlCore, urls: &[String], format: OutputFormat) -> Result<()> {
    let results = core.download_all(urls).await?;
    let failed = results.iter().filter(|o| !o.is_success()).count();

    let response = DownloadResponse { results };
    print_output(&response, format, |response| {
        for outcome in &response.results {
            match (&outcome.saved_path, &outcome.error_message) {
                (Some(path), _) => println!(
                    "{} {} -> {}",
                    style("✓").green().bold(),
                    outcome.url,
                    style(path.display()).cyan()
                ),
                (None, error) => println!(
                    "{} {}: {}",
                    style("✗").red().bold(),
                    outcome.url,
                    error.as_deref().unwrap_or("unknown error")
                ),
            }
        }
    })?;

    if failed > 0 {
        anyhow::bail!("{} of {} downloads failed", failed, urls.len());
    }
    Ok(())
}
