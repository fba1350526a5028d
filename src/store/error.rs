/// Errors that can occur while writing channel stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the Arrow library during array operations
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Error from the Parquet library during file writing
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Error serializing or deserializing the store manifest
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Invalid data provided to the store
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Append to a channel that was never ensured
    #[error("Channel {0} has no store")]
    UnknownChannel(u32),

    /// Store already exists at the specified location
    #[error("Store already exists: {0}")]
    AlreadyExists(String),
}
