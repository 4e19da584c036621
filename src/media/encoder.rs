use super::error::{Result, ServiceError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

#[async_trait]
pub trait AudioEncoder: Send + Sync {
    /// Extracts the audio track of `input` into an mp3 at `output`.
    async fn transcode_to_audio(&self, input: &Path, output: &Path) -> Result<()>;
}

/// ffmpeg with fixed mp3 settings: no video, 128 kbps, 44.1 kHz, overwrite.
pub struct Ffmpeg {
    program: PathBuf,
    timeout: Duration,
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-ab")
            .arg("128k")
            .arg("-ar")
            .arg("44100")
            .arg("-y")
            .arg(output)
            .kill_on_drop(true);
        command
    }

    pub async fn test_availability(&self) -> bool {
        match Command::new(&self.program).arg("-version").output().await {
            Ok(output) if output.status.success() => {
                let version_line = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("unknown")
                    .to_string();
                info!("✅ ffmpeg is available: {}", version_line);
                true
            }
            Ok(_) => {
                warn!("❌ ffmpeg command failed");
                false
            }
            Err(e) => {
                warn!("❌ ffmpeg not found: {} (required for mp3 extraction)", e);
                false
            }
        }
    }
}

#[async_trait]
impl AudioEncoder for Ffmpeg {
    async fn transcode_to_audio(&self, input: &Path, output: &Path) -> Result<()> {
        info!("Transcoding {} to {}", input.display(), output.display());

        let result = tokio::time::timeout(self.timeout, self.command(input, output).output())
            .await
            .map_err(|_| ServiceError::Transcode("ffmpeg timed out".to_string()))?
            .map_err(|e| ServiceError::Transcode(format!("Failed to run ffmpeg: {e}")))?;

        if !result.status.success() {
            let error = String::from_utf8_lossy(&result.stderr);
            warn!("ffmpeg failed with status {}: {}", result.status, error);
            return Err(ServiceError::Transcode(error.trim().to_string()));
        }

        Ok(())
    }
}
