//! imgdl - image search proxy and bulk downloader
//!
//! Runs the HTTP API by default; `search` and `download` run a single
//! operation from the command line.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use imgdl_core::ImgdlCore;
use imgdl_server::load_settings;
use imgdl_types::{ProviderKind, Settings};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// imgdl - image search and download server
#[derive(Parser)]
#[command(name = "imgdl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// JSON settings file
    #[arg(long, env = "IMGDL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory downloaded images are written to
    #[arg(long, env = "IMGDL_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Search provider (duckduckgo or bing)
    #[arg(long, env = "IMGDL_PROVIDER")]
    provider: Option<ProviderKind>,

    /// Output format for one-shot commands
    #[arg(long, default_value = "human")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind
        #[arg(long, env = "IMGDL_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "IMGDL_PORT")]
        port: Option<u16>,
    },

    /// Search for images and print the results
    Search {
        /// Search terms
        query: String,

        /// Size filter: small, medium, large, wallpaper, 2k, 4k or 8k
        #[arg(short, long, default_value = "")]
        size: String,

        /// Number of batches to fetch
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Download images into the download directory
    Download {
        /// Image URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn settings_from(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(dir) = &cli.download_dir {
        settings.download_dir = dir.clone();
    }
    if let Some(provider) = cli.provider {
        settings.provider = provider;
    }
    Ok(settings)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = settings_from(&cli)?;

    match cli.command {
        None => {
            let core = ImgdlCore::new(settings.clone()).await?;
            serve(core, &settings).await?
        }

        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            let core = ImgdlCore::new(settings.clone()).await?;
            serve(core, &settings).await?
        }

        Some(Commands::Search { query, size, pages }) => {
            let core = ImgdlCore::new(settings).await?;
            commands::search(&core, &query, &size, pages, cli.output).await?
        }

        Some(Commands::Download { urls }) => {
            let core = ImgdlCore::new(settings).await?;
            commands::download(&core, &urls, cli.output).await?
        }
    }

    Ok(())
}

async fn serve(core: ImgdlCore, settings: &Settings) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", settings.host, settings.port))?;

    imgdl_server::serve(core, addr, shutdown_signal()).await
}
