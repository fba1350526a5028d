//! Storage profiles for common use cases.
//!
//! Profiles pick compression and chunking for the channel stores so users do
//! not have to tune Parquet settings directly.

use std::fmt;
use std::str::FromStr;

use spikedemux::store::{CompressionType, StoreConfig};

/// Storage profiles for common use cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// Prioritize speed over file size.
    ///
    /// - Compression: Snappy
    /// - Chunk shift: 4
    Fast,

    /// Balance between speed and file size (default).
    ///
    /// - Compression: ZSTD level 3
    /// - Chunk shift: 4
    #[default]
    Balanced,

    /// Smallest files, slower writes.
    ///
    /// - Compression: ZSTD level 19
    /// - Chunk shift: 2 (larger per-channel chunks)
    MaxCompression,
}

impl Profile {
    /// Store configuration for this profile
    pub fn store_config(&self) -> StoreConfig {
        match self {
            Profile::Fast => StoreConfig::fast_write(),
            Profile::Balanced => StoreConfig::balanced(),
            Profile::MaxCompression => StoreConfig::max_compression(),
        }
    }

    /// Returns all available profile names.
    pub fn variants() -> &'static [&'static str] {
        &["fast", "balanced", "max-compression"]
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Fast => write!(f, "fast"),
            Profile::Balanced => write!(f, "balanced"),
            Profile::MaxCompression => write!(f, "max-compression"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Profile::Fast),
            "balanced" | "default" => Ok(Profile::Balanced),
            "max-compression" | "maxcompression" | "max" => Ok(Profile::MaxCompression),
            _ => Err(format!(
                "Unknown profile '{}'. Valid options: {}",
                s,
                Profile::variants().join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults() {
        let balanced = Profile::default();
        assert_eq!(balanced, Profile::Balanced);
        let config = balanced.store_config();
        assert_eq!(config.compression, CompressionType::Zstd(3));
        assert_eq!(config.chunk_shift, 4);
    }

    #[test]
    fn test_max_compression_uses_larger_chunks() {
        let config = Profile::MaxCompression.store_config();
        assert_eq!(config.compression, CompressionType::Zstd(19));
        assert!(config.chunk_rows(1024) > Profile::Fast.store_config().chunk_rows(1024));
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!(Profile::from_str("fast").unwrap(), Profile::Fast);
        assert_eq!(Profile::from_str("BALANCED").unwrap(), Profile::Balanced);
        assert_eq!(
            Profile::from_str("max-compression").unwrap(),
            Profile::MaxCompression
        );
        assert!(Profile::from_str("invalid").is_err());
    }
}
