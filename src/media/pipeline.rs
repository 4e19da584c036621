use super::encoder::AudioEncoder;
use super::error::{Result, ServiceError};
use super::fetch::Fetch;
use super::types::ByteStream;
use crate::scratch::ScratchDir;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

/// Byte stream that keeps `held` alive until the stream is dropped. Used for
/// child processes and scratch files that must outlive the response headers.
struct Holding<H> {
    inner: ByteStream,
    _held: H,
}

impl<H: Unpin> Stream for Holding<H> {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}

pub fn hold<H: Send + Unpin + 'static>(inner: ByteStream, held: H) -> ByteStream {
    Box::pin(Holding { inner, _held: held })
}

/// Logs errors that happen after the response has started. At that point the
/// status line is gone, the connection is simply cut.
pub fn log_stream_errors(stream: ByteStream, context: String) -> ByteStream {
    Box::pin(stream.inspect_err(move |e| warn!("Stream error for {}: {}", context, e)))
}

/// Pass-through of a remote media body.
pub async fn proxy(fetch: &dyn Fetch, url: &str) -> Result<ByteStream> {
    fetch.fetch_media(url).await
}

/// Downloads `url` into a scratch file, extracts its audio track next to it and
/// streams the result. Both files are removed once the returned stream is dropped.
pub async fn transcode_to_mp3(
    fetch: &dyn Fetch,
    encoder: &dyn AudioEncoder,
    scratch: &ScratchDir,
    url: &str,
) -> Result<ByteStream> {
    let input = scratch.create("mp4")?;
    let output = input.sibling("mp3")?;

    let mut body = fetch.fetch_media(url).await?;
    let mut file = tokio::fs::File::create(input.path()).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ServiceError::stream(format!("Failed to fetch {url}: {e}")))?;
        written += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);
    info!("Fetched {} bytes into {}", written, input.path().display());

    encoder.transcode_to_audio(input.path(), output.path()).await?;

    let converted = tokio::fs::File::open(output.path()).await.map_err(|e| {
        ServiceError::Transcode(format!("Encoder produced no output: {e}"))
    })?;

    Ok(hold(Box::pin(ReaderStream::new(converted)), (input, output)))
}
