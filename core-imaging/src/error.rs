use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImagingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// The blocking worker panicked or was cancelled.
    #[error("Image task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ImagingError>;
