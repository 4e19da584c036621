use super::error::{Result, ServiceError};
use super::extractor::Extractor;
use super::formats::{default_youtube_formats, select_youtube_formats, RawFormat};
use super::types::{
    ByteStream, Container, Download, DownloadRequest, MediaInfo, Platform, VideoInfo, VideoSource,
};
use crate::utils::{format_duration, sanitize_title};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

const PLACEHOLDER_THUMBNAIL: &str =
    "https://via.placeholder.com/640x360/4a6cf7/ffffff?text=YouTube+Video";

const WATCH_HOSTS: [&str; 7] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "gaming.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];
const PATH_PREFIXES: [&str; 5] = ["embed", "v", "shorts", "live", "e"];

/// What the YouTube backend knows about a video.
#[derive(Debug, Clone, Default)]
pub struct BasicInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_secs: Option<u64>,
    pub author: Option<String>,
    pub formats: Vec<RawFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSelection {
    HighestAudio,
    /// Audio and video in one stream, at the given quality label (e.g. `720p`).
    Muxed { quality: String },
}

impl StreamSelection {
    pub fn for_request(format: Container, quality: &str) -> Self {
        match format {
            Container::Mp3 => Self::HighestAudio,
            Container::Mp4 => Self::Muxed {
                quality: quality.to_string(),
            },
        }
    }
}

/// Metadata and stream resolution for YouTube videos.
#[async_trait]
pub trait YoutubeBackend: Send + Sync {
    async fn basic_info(&self, video_id: &str) -> Result<BasicInfo>;

    async fn open_stream(&self, video_id: &str, selection: &StreamSelection) -> Result<ByteStream>;
}

/// Extracts the 11-character video id, dropping playlist and tracking parameters.
pub fn video_id(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| ServiceError::extraction(format!("Invalid YouTube URL: {e}")))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());

    let candidate = if host == "youtu.be" || host == "www.youtu.be" {
        segments.next().map(str::to_string)
    } else if WATCH_HOSTS.contains(&host.as_str()) {
        match url.query_pairs().find(|(key, _)| key == "v") {
            Some((_, value)) => Some(value.into_owned()),
            None => match (segments.next(), segments.next()) {
                (Some(prefix), Some(id)) if PATH_PREFIXES.contains(&prefix) => Some(id.to_string()),
                _ => None,
            },
        }
    } else {
        return Err(ServiceError::extraction(format!("Not a YouTube domain: {host}")));
    };

    let id: String = candidate
        .ok_or_else(|| ServiceError::extraction(format!("No video id found: {raw}")))?
        .chars()
        .take(11)
        .collect();

    let well_formed = id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !well_formed {
        return Err(ServiceError::extraction(format!("Malformed video id: {id}")));
    }
    Ok(id)
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

pub struct YoutubeExtractor {
    backend: Arc<dyn YoutubeBackend>,
}

impl YoutubeExtractor {
    pub fn new(backend: Arc<dyn YoutubeBackend>) -> Self {
        Self { backend }
    }

    async fn resolve_info(&self, source: &VideoSource) -> Result<MediaInfo> {
        let id = video_id(source.url())?;
        info!("Processing YouTube video ID: {}", id);

        let basic = self.backend.basic_info(&id).await?;
        let video = VideoInfo {
            title: basic.title.unwrap_or_else(|| "Unknown Title".to_string()),
            thumbnail: basic
                .thumbnail
                .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string()),
            duration: basic
                .duration_secs
                .map(format_duration)
                .unwrap_or_else(|| "0:00".to_string()),
            author: basic.author.unwrap_or_else(|| "Unknown Author".to_string()),
        };

        Ok(MediaInfo {
            video,
            formats: select_youtube_formats(&basic.formats),
        })
    }

    fn degraded_info() -> MediaInfo {
        MediaInfo {
            video: VideoInfo {
                title: "YouTube Video (Error retrieving details)".to_string(),
                thumbnail: PLACEHOLDER_THUMBNAIL.to_string(),
                duration: "0:00".to_string(),
                author: "Unknown".to_string(),
            },
            formats: default_youtube_formats(),
        }
    }
}

#[async_trait]
impl Extractor for YoutubeExtractor {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    /// Never fails: any upstream problem degrades to placeholder details and
    /// the default rendition set.
    async fn fetch_info(&self, source: &VideoSource) -> Result<MediaInfo> {
        match self.resolve_info(source).await {
            Ok(info) => Ok(info),
            Err(e) => {
                warn!("YouTube processing error for {}: {}", source.url(), e);
                Ok(Self::degraded_info())
            }
        }
    }

    async fn download(&self, request: &DownloadRequest) -> Result<Download> {
        let id = video_id(request.source.url())?;
        let basic = self.backend.basic_info(&id).await?;

        let title = basic
            .title
            .as_deref()
            .map(sanitize_title)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| id.clone());

        let selection = StreamSelection::for_request(request.format, &request.quality);
        info!("Streaming YouTube video {} as {:?}", id, selection);
        let body = self.backend.open_stream(&id, &selection).await?;

        Ok(Download {
            filename: format!("{}.{}", title, request.format.extension()),
            content_type: request.format.content_type(),
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::types::MediaKind;
    use bytes::Bytes;
    use futures::TryStreamExt;
    use std::sync::Mutex;

    /// In-memory backend recording the stream selections it was asked for.
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub info: Option<BasicInfo>,
        pub requested: Mutex<Vec<(String, StreamSelection)>>,
    }

    #[async_trait]
    impl YoutubeBackend for FakeBackend {
        async fn basic_info(&self, video_id: &str) -> Result<BasicInfo> {
            self.info
                .clone()
                .ok_or_else(|| ServiceError::extraction(format!("Video unavailable: {video_id}")))
        }

        async fn open_stream(&self, video_id: &str, selection: &StreamSelection) -> Result<ByteStream> {
            self.requested
                .lock()
                .unwrap()
                .push((video_id.to_string(), selection.clone()));
            let chunks = vec![Ok(Bytes::from_static(b"yt-")), Ok(Bytes::from_static(b"bytes"))];
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    pub(crate) fn sample_info() -> BasicInfo {
        BasicInfo {
            title: Some("Never Gonna: Give You Up!".to_string()),
            thumbnail: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg".to_string()),
            duration_secs: Some(212),
            author: Some("Rick Astley".to_string()),
            formats: vec![
                RawFormat {
                    has_video: true,
                    has_audio: true,
                    quality_label: Some("360p".to_string()),
                    audio_bitrate: Some(96.0),
                    content_length: Some(10 * 1024 * 1024),
                },
                RawFormat {
                    has_video: false,
                    has_audio: true,
                    quality_label: None,
                    audio_bitrate: Some(160.0),
                    content_length: Some(3 * 1024 * 1024),
                },
            ],
        }
    }

    fn source(url: &str) -> VideoSource {
        VideoSource::parse(url).unwrap()
    }

    #[test]
    fn test_video_id_variants() {
        let expected = "dQw4w9WgXcQ";
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI&index=2",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42s",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ&si=abc",
            "https://youtu.be/dQw4w9WgXcQ?si=tracking",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ?feature=share",
            "youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert_eq!(video_id(url).unwrap(), expected, "{url}");
        }
    }

    #[test]
    fn test_video_id_rejects_bad_urls() {
        assert!(video_id("https://www.youtube.com/").is_err());
        assert!(video_id("https://www.youtube.com/watch?v=short").is_err());
        assert!(video_id("https://www.youtube.com/watch?v=bad$chars!!!").is_err());
        assert!(video_id("https://notyoutube.com/watch?v=dQw4w9WgXcQ").is_err());
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("dQw4w9WgXcQ"), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_fetch_info_normalizes_metadata() {
        let extractor = YoutubeExtractor::new(Arc::new(FakeBackend {
            info: Some(sample_info()),
            ..Default::default()
        }));
        let info = extractor
            .fetch_info(&source("https://youtu.be/dQw4w9WgXcQ"))
            .await
            .unwrap();

        assert_eq!(info.video.title, "Never Gonna: Give You Up!");
        assert_eq!(info.video.duration, "3:32");
        assert_eq!(info.video.author, "Rick Astley");
        let ids: Vec<&str> = info.formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["yt-mp4-360", "yt-mp3-high"]);
        assert_eq!(info.formats[0].size, "10 MB");
    }

    #[tokio::test]
    async fn test_fetch_info_fills_missing_fields() {
        let extractor = YoutubeExtractor::new(Arc::new(FakeBackend {
            info: Some(BasicInfo::default()),
            ..Default::default()
        }));
        let info = extractor
            .fetch_info(&source("https://youtu.be/dQw4w9WgXcQ"))
            .await
            .unwrap();

        assert_eq!(info.video.title, "Unknown Title");
        assert_eq!(info.video.thumbnail, PLACEHOLDER_THUMBNAIL);
        assert_eq!(info.video.duration, "0:00");
        assert_eq!(info.video.author, "Unknown Author");
        assert_eq!(info.formats, default_youtube_formats());
    }

    #[tokio::test]
    async fn test_fetch_info_degrades_on_backend_failure() {
        // Unlike TikTok/Facebook, an unreachable upstream is not an error here.
        let extractor = YoutubeExtractor::new(Arc::new(FakeBackend::default()));
        let info = extractor
            .fetch_info(&source("https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
            .await
            .unwrap();

        assert_eq!(info.video.title, "YouTube Video (Error retrieving details)");
        assert_eq!(info.video.author, "Unknown");
        assert_eq!(info.video.duration, "0:00");
        assert_eq!(info.video.thumbnail, PLACEHOLDER_THUMBNAIL);
        let qualities: Vec<(&str, MediaKind)> = info
            .formats
            .iter()
            .map(|f| (f.quality.as_str(), f.kind))
            .collect();
        assert_eq!(
            qualities,
            vec![
                ("720p", MediaKind::Video),
                ("480p", MediaKind::Video),
                ("High", MediaKind::Audio)
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_info_degrades_on_bad_id() {
        let extractor = YoutubeExtractor::new(Arc::new(FakeBackend {
            info: Some(sample_info()),
            ..Default::default()
        }));
        let info = extractor
            .fetch_info(&source("https://www.youtube.com/feed/trending"))
            .await
            .unwrap();
        assert_eq!(info.formats, default_youtube_formats());
    }

    #[tokio::test]
    async fn test_download_selects_stream_and_names_file() {
        let backend = Arc::new(FakeBackend {
            info: Some(sample_info()),
            ..Default::default()
        });
        let extractor = YoutubeExtractor::new(backend.clone());

        let request = DownloadRequest {
            source: source("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123"),
            format: Container::Mp4,
            quality: "360p".to_string(),
            watermark: None,
        };
        let download = extractor.download(&request).await.unwrap();
        assert_eq!(download.filename, "Never Gonna Give You Up.mp4");
        assert_eq!(download.content_type, "video/mp4");
        let body: Vec<Bytes> = download.body.try_collect().await.unwrap();
        assert_eq!(body.concat(), b"yt-bytes");

        let request = DownloadRequest {
            format: Container::Mp3,
            quality: "High".to_string(),
            ..request
        };
        let download = extractor.download(&request).await.unwrap();
        assert_eq!(download.filename, "Never Gonna Give You Up.mp3");
        assert_eq!(download.content_type, "audio/mpeg");

        let requested = backend.requested.lock().unwrap();
        assert_eq!(
            *requested,
            vec![
                (
                    "dQw4w9WgXcQ".to_string(),
                    StreamSelection::Muxed {
                        quality: "360p".to_string()
                    }
                ),
                ("dQw4w9WgXcQ".to_string(), StreamSelection::HighestAudio),
            ]
        );
    }

    #[tokio::test]
    async fn test_download_falls_back_to_id_for_empty_title() {
        let extractor = YoutubeExtractor::new(Arc::new(FakeBackend {
            info: Some(BasicInfo {
                title: Some("???".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }));
        let request = DownloadRequest {
            source: source("https://youtu.be/dQw4w9WgXcQ"),
            format: Container::Mp3,
            quality: "High".to_string(),
            watermark: None,
        };
        let download = extractor.download(&request).await.unwrap();
        assert_eq!(download.filename, "dQw4w9WgXcQ.mp3");
    }

    #[tokio::test]
    async fn test_download_propagates_backend_failure() {
        let extractor = YoutubeExtractor::new(Arc::new(FakeBackend::default()));
        let request = DownloadRequest {
            source: source("https://youtu.be/dQw4w9WgXcQ"),
            format: Container::Mp4,
            quality: "720p".to_string(),
            watermark: None,
        };
        assert!(matches!(
            extractor.download(&request).await,
            Err(ServiceError::Extraction(_))
        ));
    }
}
