use std::fmt;

/// Kind of key a lookup failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Channel id
    Channel,
    /// Unit id
    Unit,
    /// Channel group name
    ChannelGroup,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Channel => write!(f, "channel"),
            KeyKind::Unit => write!(f, "unit"),
            KeyKind::ChannelGroup => write!(f, "channel group"),
        }
    }
}

/// Errors raised by an event source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error while reading the container
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A requested channel, unit or group has no data
    #[error("No {kind} named '{key}' in recording")]
    MissingKey {
        /// What was looked up
        kind: KeyKind,
        /// The key that was requested
        key: String,
    },

    /// Container description did not match any known file kind
    #[error("Unknown container kind: '{0}'")]
    UnknownContainer(String),

    /// Container kind does not provide the requested data
    #[error("Unsupported container: {0}")]
    UnsupportedContainer(String),

    /// Requested range lies outside the array
    #[error("Range {start}..{end} out of bounds for array of length {len}")]
    OutOfBounds {
        /// Range start
        start: usize,
        /// Range end
        end: usize,
        /// Array length
        len: usize,
    },
}

impl SourceError {
    /// Shorthand for a missing key error
    pub fn missing(kind: KeyKind, key: impl ToString) -> Self {
        SourceError::MissingKey {
            kind,
            key: key.to_string(),
        }
    }
}
