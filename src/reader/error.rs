use crate::source::SourceError;

/// Errors that can occur while streaming spike events
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// Array sizes are inconsistent with each other
    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    /// The source holds data in a layout the reader cannot stream
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Error from the underlying source
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),
}
