use thiserror::Error;

/// Why a catalog JSON document could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogParseError {
    #[error("Catalog must be a JSON array of collections")]
    NotAnArray,

    /// The parser ran out of input; the document was likely cut off mid-upload.
    #[error("Catalog JSON ends unexpectedly (incomplete upload?): {0}")]
    Truncated(String),

    #[error("Catalog JSON is malformed: {0}")]
    Malformed(String),

    #[error("Collection at index {index} is invalid: {message}")]
    InvalidRecord { index: usize, message: String },
}

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A stored record could not be encoded or decoded.
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] CatalogParseError),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
