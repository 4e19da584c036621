use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Unsupported platform")]
    UnsupportedPlatform,

    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// Upstream page or metadata could not be fetched or parsed.
    #[error("{0}")]
    Extraction(String),

    #[error("Selected format not available")]
    RenditionUnavailable,

    #[error("Transcoding failed: {0}")]
    Transcode(String),

    #[error("Stream failed: {0}")]
    Stream(String),

    #[error("Scratch I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingUrl | Self::UnsupportedPlatform | Self::InvalidParameter { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
