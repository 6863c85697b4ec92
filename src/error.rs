use thiserror::Error;

/// Main error type for famtree
#[derive(Error, Debug)]
pub enum FamtreeError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TEI/XML input
    #[error("XML error: {0}")]
    Xml(String),

    /// Person id not present in the record source or canonical map
    #[error("Person not found: {0}")]
    PersonNotFound(String),

    /// Diagram rendering failed for one anchor
    #[error("Render error: {0}")]
    Render(String),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using FamtreeError
pub type Result<T> = std::result::Result<T, FamtreeError>;
