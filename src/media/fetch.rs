use super::error::{Result, ServiceError};
use super::types::ByteStream;
use crate::config::HttpSettings;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;
use tracing::debug;

/// Plain HTTP access to upstream pages and media files.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Body of an HTML page.
    async fn fetch_page(&self, url: &str) -> Result<String>;

    /// Body of a media file, streamed.
    async fn fetch_media(&self, url: &str) -> Result<ByteStream>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    page_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        // No overall timeout here: media bodies can take long, only stalls are bounded.
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .read_timeout(Duration::from_secs(settings.read_timeout_secs))
            .build()
            .map_err(|e| ServiceError::extraction(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            page_timeout: Duration::from_secs(settings.page_timeout_secs),
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        debug!("Fetching page: {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.page_timeout)
            .send()
            .await
            .map_err(|e| ServiceError::extraction(format!("Failed to fetch page: {e}")))?;

        if !response.status().is_success() {
            return Err(ServiceError::extraction(format!(
                "Failed to fetch page: HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ServiceError::extraction(format!("Failed to read page: {e}")))
    }

    async fn fetch_media(&self, url: &str) -> Result<ByteStream> {
        debug!("Fetching media: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::stream(format!("Failed to fetch media URL: {e}")))?;

        if !response.status().is_success() {
            return Err(ServiceError::stream(format!(
                "Failed to download media: HTTP {}",
                response.status()
            )));
        }

        Ok(Box::pin(response.bytes_stream().map_err(std::io::Error::other)))
    }
}
