mod janitor;

pub use janitor::Janitor;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Local directory holding in-flight transcoding work.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Creates the directory if it does not exist yet.
    pub fn init(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        info!("Scratch directory ready at {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// New empty file named after the current timestamp. The random suffix keeps
    /// concurrent requests landing in the same millisecond apart.
    pub fn create(&self, extension: &str) -> io::Result<ScratchFile> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix(&format!("{millis}-"))
            .suffix(&format!(".{extension}"))
            .rand_bytes(6)
            .tempfile_in(&self.path)?;

        let path = file.into_temp_path();
        debug!("Created scratch file {}", path.display());
        Ok(ScratchFile { path: Some(path) })
    }
}

/// Owns a scratch file and unlinks it on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<TempPath>,
}

impl ScratchFile {
    /// Same name with another extension; the file itself is created by whoever writes it.
    pub fn sibling(&self, extension: &str) -> io::Result<ScratchFile> {
        let path = self.path().with_extension(extension);
        Ok(ScratchFile {
            path: Some(TempPath::try_from_path(path)?),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        let shown = path.display().to_string();

        match path.close() {
            Ok(()) => debug!("Removed scratch file {}", shown),
            // Already swept by the janitor or never written.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch file {}: {}", shown, e),
        }
    }
}
