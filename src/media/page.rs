use super::encoder::AudioEncoder;
use super::error::{Result, ServiceError};
use super::extractor::Extractor;
use super::fetch::Fetch;
use super::formats::page_formats;
use super::pipeline::{proxy, transcode_to_mp3};
use super::types::{
    Container, Download, DownloadRequest, MediaInfo, MediaKind, Platform, Rendition, VideoInfo,
    VideoSource,
};
use crate::scratch::ScratchDir;
use async_trait::async_trait;
use select::document::Document;
use select::predicate::Name;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-platform constants for sites scraped through their Open Graph tags.
#[derive(Debug, Clone, Copy)]
struct Site {
    platform: Platform,
    id_prefix: &'static str,
    default_title: &'static str,
    author: &'static str,
    placeholder_thumbnail: &'static str,
}

const TIKTOK: Site = Site {
    platform: Platform::TikTok,
    id_prefix: "tt",
    default_title: "TikTok Video",
    author: "TikTok User",
    placeholder_thumbnail: "https://via.placeholder.com/640x360/4a6cf7/ffffff?text=TikTok+Video",
};

const FACEBOOK: Site = Site {
    platform: Platform::Facebook,
    id_prefix: "fb",
    default_title: "Facebook Video",
    author: "Facebook User",
    placeholder_thumbnail: "https://via.placeholder.com/640x360/4a6cf7/ffffff?text=Facebook+Video",
};

/// What the page itself tells us.
#[derive(Debug, Default, PartialEq)]
struct PageMeta {
    title: Option<String>,
    video: Option<String>,
    image: Option<String>,
}

fn parse_page(html: &str) -> PageMeta {
    let document = Document::from(html);

    let title = document
        .find(Name("title"))
        .next()
        .map(|n| n.text().trim().to_string())
        .filter(|t| !t.is_empty());

    let property = |name: &str| {
        document
            .find(Name("meta"))
            .find(|n| n.attr("property") == Some(name))
            .and_then(|n| n.attr("content"))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    };

    PageMeta {
        title,
        video: property("og:video"),
        image: property("og:image"),
    }
}

/// TikTok and Facebook: page HTML, `<title>` and `og:video`/`og:image`.
/// Page fetch failures are surfaced, there is no degraded answer.
pub struct OpenGraphExtractor {
    site: Site,
    fetch: Arc<dyn Fetch>,
    encoder: Arc<dyn AudioEncoder>,
    scratch: ScratchDir,
}

impl OpenGraphExtractor {
    pub fn tiktok(fetch: Arc<dyn Fetch>, encoder: Arc<dyn AudioEncoder>, scratch: ScratchDir) -> Self {
        Self {
            site: TIKTOK,
            fetch,
            encoder,
            scratch,
        }
    }

    pub fn facebook(fetch: Arc<dyn Fetch>, encoder: Arc<dyn AudioEncoder>, scratch: ScratchDir) -> Self {
        Self {
            site: FACEBOOK,
            fetch,
            encoder,
            scratch,
        }
    }

    fn select<'a>(formats: &'a [Rendition], request: &DownloadRequest) -> Option<&'a Rendition> {
        formats.iter().find(|f| {
            f.format == request.format
                && (f.kind == MediaKind::Audio || f.watermark == request.watermark)
        })
    }
}

#[async_trait]
impl Extractor for OpenGraphExtractor {
    fn platform(&self) -> Platform {
        self.site.platform
    }

    async fn fetch_info(&self, source: &VideoSource) -> Result<MediaInfo> {
        let html = self.fetch.fetch_page(source.url()).await.map_err(|e| {
            ServiceError::extraction(format!(
                "Failed to fetch {} video info: {}",
                self.site.platform.display_name(),
                e
            ))
        })?;
        let meta = parse_page(&html);

        if meta.video.is_none() {
            warn!("No og:video tag on {}, renditions will not be downloadable", source.url());
        }

        Ok(MediaInfo {
            video: VideoInfo {
                title: meta.title.unwrap_or_else(|| self.site.default_title.to_string()),
                thumbnail: meta
                    .image
                    .unwrap_or_else(|| self.site.placeholder_thumbnail.to_string()),
                duration: "0:00".to_string(),
                author: self.site.author.to_string(),
            },
            formats: page_formats(self.site.id_prefix, meta.video.as_deref()),
        })
    }

    async fn download(&self, request: &DownloadRequest) -> Result<Download> {
        // Fresh lookup; URLs handed out by an earlier /info call are not reused.
        let info = self.fetch_info(&request.source).await?;
        let url = Self::select(&info.formats, request)
            .and_then(|f| f.url.clone())
            .ok_or(ServiceError::RenditionUnavailable)?;

        let filename = request.attachment_name();
        info!("Downloading {} as {}", url, filename);

        let body = match request.format {
            Container::Mp3 => {
                transcode_to_mp3(self.fetch.as_ref(), self.encoder.as_ref(), &self.scratch, &url)
                    .await?
            }
            Container::Mp4 => proxy(self.fetch.as_ref(), &url).await?,
        };

        Ok(Download {
            filename,
            content_type: request.format.content_type(),
            body,
        })
    }
}
