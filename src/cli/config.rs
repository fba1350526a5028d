//! TOML configuration file support.
//!
//! Settings that would otherwise need several flags can live in a file:
//!
//! ```toml
//! # spikedemux.toml
//! [reader]
//! chunk_multiplier = 4
//! max_chunks = 100
//!
//! [store]
//! compression_level = 9
//! chunk_shift = 3
//! write_statistics = false
//!
//! [demux]
//! eager_channels = true
//!
//! [export]
//! group = "Group 1"
//! ```
//!
//! Values given here override the selected profile; command-line flags
//! override both.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use spikedemux::reader::ReaderConfig;
use spikedemux::store::{CompressionType, StoreConfig};

/// Root configuration structure for spikedemux.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How the source is read.
    #[serde(default)]
    pub reader: ReaderSection,

    /// How channel stores are written.
    #[serde(default)]
    pub store: StoreSection,

    /// Demultiplexing pass settings.
    #[serde(default)]
    pub demux: DemuxSection,

    /// Text export settings.
    #[serde(default)]
    pub export: ExportSection,
}

/// `[reader]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderSection {
    /// Native chunks read per step.
    pub chunk_multiplier: Option<usize>,

    /// Stop after this many chunks.
    pub max_chunks: Option<usize>,
}

/// `[store]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// ZSTD compression level (1-22).
    pub compression_level: Option<i32>,

    /// Right shift from the source chunk to the per-channel chunk.
    pub chunk_shift: Option<u32>,

    /// Write column statistics.
    pub write_statistics: Option<bool>,
}

/// `[demux]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemuxSection {
    /// Create a store for every labelled channel.
    pub eager_channels: Option<bool>,
}

/// `[export]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    /// Channel group to export.
    pub group: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Apply the `[reader]` table on top of `config`
    pub fn apply_reader(&self, mut config: ReaderConfig) -> ReaderConfig {
        if let Some(multiplier) = self.reader.chunk_multiplier {
            config.chunk_multiplier = multiplier;
        }
        if let Some(max_chunks) = self.reader.max_chunks {
            config.max_chunks = Some(max_chunks);
        }
        config
    }

    /// Apply the `[store]` table on top of `config`
    pub fn apply_store(&self, mut config: StoreConfig) -> StoreConfig {
        if let Some(level) = self.store.compression_level {
            config.compression = CompressionType::Zstd(level);
        }
        if let Some(shift) = self.store.chunk_shift {
            config.chunk_shift = shift;
        }
        if let Some(statistics) = self.store.write_statistics {
            config.write_statistics = statistics;
        }
        config
    }
}
