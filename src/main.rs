use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod config;
mod media;
mod scratch;
mod server;
mod utils;

use config::Config;
use media::{Ffmpeg, HttpFetcher, MediaService, YtDlp};
use scratch::{Janitor, ScratchDir};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on, overrides the config file and PORT
    #[arg(short, long)]
    port: Option<u16>,
}

fn get_config_path(args: &Args) -> Option<String> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("CONFIG_FILE") {
        return Some(path);
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = format!("{}/clipgrab/config.toml", xdg_config_home);
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = format!("{}/.config/clipgrab/config.toml", home.display());
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    None
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match get_config_path(args) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::default(),
    };
    config.apply_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    if config.get_logging_format() == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("Starting clipgrab...");
    match get_config_path(&args) {
        Some(path) => info!("Loaded config from: {}", path),
        None => info!("No config file found, using defaults"),
    }

    let scratch = ScratchDir::init(&config.scratch.dir).with_context(|| {
        format!(
            "Failed to create scratch directory {}",
            config.scratch.dir.display()
        )
    })?;

    let ytdlp = YtDlp::new(
        &config.tools.yt_dlp,
        Duration::from_secs(config.tools.metadata_timeout_secs),
    );
    let ffmpeg = Ffmpeg::new(
        &config.tools.ffmpeg,
        Duration::from_secs(config.tools.encoder_timeout_secs),
    );
    ytdlp.test_availability().await;
    ffmpeg.test_availability().await;

    let fetcher = HttpFetcher::new(&config.http).context("Failed to build HTTP client")?;
    let media = MediaService::new(
        Arc::new(ytdlp),
        Arc::new(fetcher),
        Arc::new(ffmpeg),
        scratch.clone(),
    );

    let shutdown = CancellationToken::new();
    let janitor = Janitor::new(
        scratch.path(),
        config.scratch.max_age(),
        config.scratch.sweep_interval(),
    )
    .spawn(shutdown.clone());

    let app = server::router(
        server::AppState {
            media: Arc::new(media),
        },
        &config.server,
    );
    let result = server::serve(app, &config.bind_addr()).await;

    shutdown.cancel();
    if let Err(e) = janitor.await {
        tracing::warn!("Janitor task ended abnormally: {}", e);
    }
    info!("clipgrab stopped");

    result
}
