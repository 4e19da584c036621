use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

/// Periodically deletes scratch entries older than `max_age`.
#[derive(Debug, Clone)]
pub struct Janitor {
    dir: PathBuf,
    max_age: Duration,
    interval: Duration,
}

impl Janitor {
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
            interval,
        }
    }

    /// One pass over the directory. Failures on single entries are logged and
    /// counted, the rest of the sweep carries on.
    pub async fn sweep(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read scratch directory {}: {}", self.dir.display(), e);
                report.failed += 1;
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read scratch entry: {}", e);
                    report.failed += 1;
                    break;
                }
            };
            let path = entry.path();

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Failed to stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("No modification time for {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            // Clock skew puts mtime in the future; that is not stale.
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.max_age {
                continue;
            }

            let removal = if metadata.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };

            match removal {
                Ok(()) => {
                    debug!("Removed stale scratch entry {} ({}s old)", path.display(), age.as_secs());
                    report.removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Sweeps right away, then on every interval tick until `shutdown` fires.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Scratch janitor running every {}s, max age {}s",
                self.interval.as_secs(),
                self.max_age.as_secs()
            );
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Scratch janitor stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        let report = self.sweep(SystemTime::now()).await;
                        if report.removed > 0 || report.failed > 0 {
                            info!(
                                "Scratch sweep removed {} entries, {} failures",
                                report.removed, report.failed
                            );
                        }
                    }
                }
            }
        })
    }
}
