use thiserror::Error;

/// Custom error types for packpress
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedOutputFormat(String),

    #[error("Archive build failed: {0}")]
    Build(String),

    #[error("Image processing failed: {0}")]
    Image(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for packpress operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;
