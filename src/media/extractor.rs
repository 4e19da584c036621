use super::error::Result;
use super::types::{Download, DownloadRequest, MediaInfo, Platform, VideoSource};
use async_trait::async_trait;

#[async_trait]
pub trait Extractor: Send + Sync {
    /// The platform this extractor answers for
    fn platform(&self) -> Platform;

    /// Video details plus the renditions offered for download
    async fn fetch_info(&self, source: &VideoSource) -> Result<MediaInfo>;

    /// Re-resolve the requested rendition and open its byte stream
    async fn download(&self, request: &DownloadRequest) -> Result<Download>;
}
