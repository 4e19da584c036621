mod encoder;
mod error;
mod extractor;
mod fetch;
mod formats;
mod page;
mod pipeline;
mod types;
mod youtube;
mod ytdlp;

pub use encoder::{AudioEncoder, Ffmpeg};
pub use error::{Result, ServiceError};
pub use extractor::Extractor;
pub use fetch::{Fetch, HttpFetcher};
pub use types::{
    Container, Download, DownloadRequest, MediaInfo, Platform, Rendition, VideoInfo, VideoSource,
};
pub use youtube::YoutubeBackend;
pub use ytdlp::YtDlp;

use crate::scratch::ScratchDir;
use page::OpenGraphExtractor;
use pipeline::log_stream_errors;
use std::sync::Arc;
use tracing::info;
use youtube::YoutubeExtractor;

/// Dispatches each request to the extractor of its platform.
pub struct MediaService {
    extractors: Vec<Box<dyn Extractor>>,
}

impl MediaService {
    pub fn new(
        youtube: Arc<dyn YoutubeBackend>,
        fetch: Arc<dyn Fetch>,
        encoder: Arc<dyn AudioEncoder>,
        scratch: ScratchDir,
    ) -> Self {
        let extractors: Vec<Box<dyn Extractor>> = vec![
            Box::new(YoutubeExtractor::new(youtube)),
            Box::new(OpenGraphExtractor::tiktok(
                fetch.clone(),
                encoder.clone(),
                scratch.clone(),
            )),
            Box::new(OpenGraphExtractor::facebook(fetch, encoder, scratch)),
        ];

        info!(
            "Media service initialized with {} extractors",
            extractors.len()
        );
        Self { extractors }
    }

    fn extractor(&self, platform: Platform) -> Result<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.platform() == platform)
            .map(|e| e.as_ref())
            .ok_or(ServiceError::UnsupportedPlatform)
    }

    pub async fn fetch_info(&self, source: &VideoSource) -> Result<MediaInfo> {
        info!("Fetching {} info for URL: {}", source.platform(), source.url());
        self.extractor(source.platform())?.fetch_info(source).await
    }

    pub async fn download(&self, request: &DownloadRequest) -> Result<Download> {
        info!(
            "Starting {} download for URL: {} ({} {})",
            request.source.platform(),
            request.source.url(),
            request.format.extension(),
            request.quality
        );

        let mut download = self
            .extractor(request.source.platform())?
            .download(request)
            .await?;
        download.body = log_stream_errors(download.body, request.source.url().to_string());
        Ok(download)
    }
}
