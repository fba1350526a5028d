use std::collections::HashMap;

use parquet::basic::{Compression, Encoding, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;

use super::columns;

/// Compression options for channel stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// ZSTD compression (recommended, best compression ratio)
    Zstd(i32),
    /// Snappy compression (faster, slightly larger files)
    Snappy,
    /// No compression (fastest write, largest files)
    Uncompressed,
}

impl Default for CompressionType {
    fn default() -> Self {
        Self::Zstd(3)
    }
}

/// Configuration for per-channel spike stores
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Compression type to use
    pub compression: CompressionType,

    /// Right shift applied to the source's native spike chunk to get the
    /// per-channel chunk length. Spikes spread over many channels, so each
    /// channel gets a proportionally smaller chunk.
    pub chunk_shift: u32,

    /// Data page size in bytes
    pub data_page_size: usize,

    /// Whether to write statistics for columns
    pub write_statistics: bool,

    /// Enable BYTE_STREAM_SPLIT encoding for the float columns
    pub use_byte_stream_split: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression: CompressionType::Zstd(3),
            chunk_shift: 4,
            data_page_size: 1024 * 1024,
            write_statistics: true,
            use_byte_stream_split: true,
        }
    }
}

impl StoreConfig {
    /// Configuration optimized for maximum compression (slower write)
    pub fn max_compression() -> Self {
        Self {
            compression: CompressionType::Zstd(19),
            chunk_shift: 2,
            data_page_size: 2 * 1024 * 1024,
            write_statistics: true,
            use_byte_stream_split: true,
        }
    }

    /// Configuration optimized for fast writing (larger files)
    pub fn fast_write() -> Self {
        Self {
            compression: CompressionType::Snappy,
            chunk_shift: 4,
            data_page_size: 512 * 1024,
            write_statistics: false,
            use_byte_stream_split: false,
        }
    }

    /// Balanced configuration (default)
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Per-channel chunk length for a source chunk of `native_chunk` spikes
    pub fn chunk_rows(&self, native_chunk: usize) -> usize {
        native_chunk
            .checked_shr(self.chunk_shift)
            .unwrap_or(0)
            .max(1)
    }

    /// Create writer properties for one channel file
    pub(super) fn to_writer_properties(
        &self,
        metadata: &HashMap<String, String>,
        chunk_rows: usize,
    ) -> WriterProperties {
        let compression = match self.compression {
            CompressionType::Zstd(level) => {
                Compression::ZSTD(ZstdLevel::try_new(level).unwrap_or_default())
            }
            CompressionType::Snappy => Compression::SNAPPY,
            CompressionType::Uncompressed => Compression::UNCOMPRESSED,
        };

        let statistics = if self.write_statistics {
            EnabledStatistics::Chunk
        } else {
            EnabledStatistics::None
        };

        // Spike times and samples are high-cardinality floats
        let mut builder = WriterProperties::builder()
            .set_compression(compression)
            .set_data_page_size_limit(self.data_page_size)
            .set_statistics_enabled(statistics)
            .set_dictionary_enabled(false)
            .set_max_row_group_size(chunk_rows);

        if self.use_byte_stream_split {
            for path in [columns::spike_times_path(), columns::wave_forms_path()] {
                builder = builder.set_column_encoding(path, Encoding::BYTE_STREAM_SPLIT);
            }
        }

        let kv_metadata: Vec<KeyValue> = metadata
            .iter()
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: Some(v.clone()),
            })
            .collect();

        builder.set_key_value_metadata(Some(kv_metadata)).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_rows_shift() {
        let config = StoreConfig::default();
        assert_eq!(config.chunk_rows(1024), 64);
        assert_eq!(config.chunk_rows(8), 1);
        assert_eq!(config.chunk_rows(0), 1);

        let unshifted = StoreConfig {
            chunk_shift: 0,
            ..Default::default()
        };
        assert_eq!(unshifted.chunk_rows(4), 4);

        let oversized = StoreConfig {
            chunk_shift: 200,
            ..Default::default()
        };
        assert_eq!(oversized.chunk_rows(1024), 1);
    }

    #[test]
    fn test_writer_properties() {
        let mut metadata = HashMap::new();
        metadata.insert("key".to_string(), "value".to_string());

        let props = StoreConfig::default().to_writer_properties(&metadata, 64);
        assert_eq!(props.max_row_group_size(), 64);
        assert_eq!(props.key_value_metadata().map(Vec::len), Some(1));
    }
}
