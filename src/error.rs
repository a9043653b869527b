use thiserror::Error;

/// Errors raised by the network and storage layers.
///
/// None of these are shown to the user verbatim; the UI maps them through
/// [`crate::security::sanitize_error_message`] first.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {0}")]
    Status(u16),

    #[error("Network stream read failed: {0}")]
    Stream(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),
}

pub type ChatResult<T> = Result<T, ChatError>;
