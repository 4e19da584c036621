use super::error::{Result, ServiceError};
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Response body bytes, already decoupled from where they come from.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    TikTok,
    Facebook,
    Unsupported,
}

impl Platform {
    /// Hostname substring match on the raw URL.
    pub fn classify(url: &str) -> Self {
        if url.contains("youtube.com") || url.contains("youtu.be") {
            Self::YouTube
        } else if url.contains("tiktok.com") {
            Self::TikTok
        } else if url.contains("facebook.com") || url.contains("fb.watch") {
            Self::Facebook
        } else {
            Self::Unsupported
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::TikTok => "tiktok",
            Self::Facebook => "facebook",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::TikTok => "TikTok",
            Self::Facebook => "Facebook",
            Self::Unsupported => "Unsupported",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL whose platform has been decided once and for all.
#[derive(Debug, Clone)]
pub struct VideoSource {
    url: String,
    platform: Platform,
}

impl VideoSource {
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ServiceError::MissingUrl);
        }

        match Platform::classify(url) {
            Platform::Unsupported => Err(ServiceError::UnsupportedPlatform),
            platform => Ok(Self {
                url: url.to_string(),
                platform,
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mp3,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Mp3 => "audio/mpeg",
        }
    }
}

impl FromStr for Container {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mp3" => Ok(Self::Mp3),
            _ => Err(ServiceError::InvalidParameter {
                name: "format",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

/// One downloadable encoding as presented to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendition {
    pub id: String,
    pub format: Container,
    pub quality: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Only meaningful on TikTok; absent elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<bool>,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Rendition {
    pub fn new(id: &str, format: Container, quality: &str, kind: MediaKind, size: String) -> Self {
        Self {
            id: id.to_string(),
            format,
            quality: quality.to_string(),
            kind,
            watermark: None,
            size,
            url: None,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub video: VideoInfo,
    pub formats: Vec<Rendition>,
}

/// Query of a download call, re-resolved against live upstream data.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub source: VideoSource,
    pub format: Container,
    pub quality: String,
    pub watermark: Option<bool>,
}

impl DownloadRequest {
    /// `watermark` is tri-state: `Some(true)` only for the literal `"true"`.
    pub fn parse_watermark(raw: Option<&str>) -> Option<bool> {
        raw.map(|value| value == "true")
    }

    /// Attachment name used by the page-scraped platforms. Only TikTok marks
    /// watermarked files. `quality` comes from the client and ends up in a
    /// header, so anything outside `[A-Za-z0-9_-]` is dropped.
    pub fn attachment_name(&self) -> String {
        let watermarked =
            self.source.platform() == Platform::TikTok && self.watermark == Some(true);
        let suffix = if watermarked { "-wm" } else { "" };
        let quality: String = self
            .quality
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        format!(
            "{}-{}{}.{}",
            self.source.platform(),
            quality,
            suffix,
            self.format.extension()
        )
    }
}

pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub body: ByteStream,
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
