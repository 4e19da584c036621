use super::error::{Result, ServiceError};
use super::formats::RawFormat;
use super::pipeline::hold;
use super::types::ByteStream;
use super::youtube::{watch_url, BasicInfo, StreamSelection, YoutubeBackend};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<YtDlpThumbnail>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpThumbnail {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    format_note: Option<String>,
    abr: Option<f64>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
}

impl From<YtDlpFormat> for RawFormat {
    fn from(format: YtDlpFormat) -> Self {
        let present = |codec: &Option<String>| codec.as_deref().is_some_and(|c| c != "none");
        RawFormat {
            has_video: present(&format.vcodec),
            has_audio: present(&format.acodec),
            quality_label: format
                .height
                .map(|h| format!("{h}p"))
                .or(format.format_note),
            audio_bitrate: format.abr,
            content_length: format
                .filesize
                .or(format.filesize_approx)
                .map(|size| size as u64),
        }
    }
}

impl From<YtDlpInfo> for BasicInfo {
    fn from(info: YtDlpInfo) -> Self {
        let thumbnail = info
            .thumbnail
            .or_else(|| info.thumbnails.into_iter().find_map(|t| t.url));
        BasicInfo {
            title: info.title,
            thumbnail,
            duration_secs: info.duration.map(|d| d as u64),
            author: info.uploader.or(info.channel),
            formats: info.formats.into_iter().map(RawFormat::from).collect(),
        }
    }
}

/// yt-dlp format selector for a requested stream.
fn format_selector(selection: &StreamSelection) -> String {
    const MUXED: &str = "[vcodec!=none][acodec!=none]";
    match selection {
        StreamSelection::HighestAudio => "bestaudio/best".to_string(),
        StreamSelection::Muxed { quality } => {
            let height: String = quality.chars().take_while(char::is_ascii_digit).collect();
            if height.is_empty() {
                format!("best{MUXED}/best")
            } else {
                format!("best[height={height}]{MUXED}/best[height<={height}]{MUXED}/best{MUXED}/best")
            }
        }
    }
}

/// YouTube backend driving the `yt-dlp` executable.
pub struct YtDlp {
    program: PathBuf,
    metadata_timeout: Duration,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>, metadata_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            metadata_timeout,
        }
    }

    pub async fn test_availability(&self) -> bool {
        match Command::new(&self.program).arg("--version").output().await {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("✅ yt-dlp is available, version: {}", version.trim());
                true
            }
            Ok(_) => {
                warn!("❌ yt-dlp command failed");
                false
            }
            Err(e) => {
                warn!("❌ yt-dlp not found: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl YoutubeBackend for YtDlp {
    async fn basic_info(&self, video_id: &str) -> Result<BasicInfo> {
        debug!("Extracting metadata with yt-dlp for: {}", video_id);

        let output = tokio::time::timeout(
            self.metadata_timeout,
            Command::new(&self.program)
                .arg("--dump-json")
                .arg("--no-download")
                .arg("--no-playlist")
                .arg("--no-warnings")
                .arg(watch_url(video_id))
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ServiceError::extraction("Media metadata extraction timed out"))?
        .map_err(|e| ServiceError::extraction(format!("Failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::extraction(format!(
                "Media metadata extraction failed: {}",
                error.trim()
            )));
        }

        let info: YtDlpInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| ServiceError::extraction(format!("Failed to parse media metadata: {e}")))?;
        Ok(info.into())
    }

    async fn open_stream(&self, video_id: &str, selection: &StreamSelection) -> Result<ByteStream> {
        let selector = format_selector(selection);
        info!("Streaming {} with yt-dlp format {}", video_id, selector);

        let mut child = Command::new(&self.program)
            .arg("--format")
            .arg(&selector)
            .arg("--output")
            .arg("-")
            .arg("--no-playlist")
            .arg("--no-part")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(watch_url(video_id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ServiceError::stream(format!("Failed to spawn yt-dlp: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ServiceError::stream("Failed to get yt-dlp stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ServiceError::stream("Failed to get yt-dlp stderr"))?;

        // Drain stderr so the pipe never blocks the child; keep the tail for errors.
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut last = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("yt-dlp: {}", line);
                last = line;
            }
            last
        });

        let mut stdout = ReaderStream::new(stdout);

        // Nothing is sent to the client before the first chunk, so failures to
        // start still surface as a proper error response.
        let first = tokio::time::timeout(self.metadata_timeout, stdout.next())
            .await
            .map_err(|_| ServiceError::stream("yt-dlp produced no output in time"))?;

        let first = match first {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Err(ServiceError::stream(format!("Failed to read yt-dlp output: {e}"))),
            None => {
                let status = child.wait().await.ok();
                let error = stderr_task.await.unwrap_or_default();
                return Err(ServiceError::stream(format!(
                    "yt-dlp exited ({}) without output: {}",
                    status.map(|s| s.to_string()).unwrap_or_default(),
                    error
                )));
            }
        };

        let body = futures::stream::once(async move { Ok(first) }).chain(stdout);
        Ok(hold(Box::pin(body), child))
    }
}
