mod error;
mod handlers;

use crate::config::ServerSettings;
use crate::media::MediaService;
use anyhow::{Context, Result};
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub media: Arc<MediaService>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    info!("CORS allow-list loaded with {} origin(s)", origins.len());

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .expose_headers([CONTENT_DISPOSITION])
}

pub fn router(state: AppState, settings: &ServerSettings) -> Router {
    let api = Router::new()
        .route("/info", post(handlers::info))
        .route("/download/youtube", get(handlers::download_youtube))
        .route("/download/tiktok", get(handlers::download_tiktok))
        .route("/download/facebook", get(handlers::download_facebook))
        .route("/test", get(handlers::health));

    let mut app = Router::new().nest("/api", api).with_state(state);

    if let Some(dir) = &settings.static_dir {
        info!("Serving front-end from {}", dir.display());
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(spa);
    }

    app.layer(cors_layer(&settings.cors_origins))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }
    info!("Shutdown signal received");
}

pub async fn serve(app: Router, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}
