//! # Per-Channel Spike Stores
//!
//! Each recording channel gets its own pair of append-only arrays:
//!
//! - `SpikeTimes`: one `f64` per spike, in seconds
//! - `WaveForms`: one row of `wave_width` `f64` samples per spike, in volts
//!
//! Both arrays grow together and are chunked with a chunk length derived from
//! the source's native spike chunk (see [`StoreConfig::chunk_shift`]), so
//! future appends and reads stay aligned to whole chunks.
//!
//! Storage is pluggable through [`StoreBackend`]:
//!
//! - [`MemoryBackend`]: arrays in memory, inspectable after a pass
//! - [`ParquetBackend`]: one directory of Parquet part files per channel plus
//!   a JSON manifest
//!
//! Stores are not transactional. If a pass fails, whatever was already
//! appended stays where it is. With [`ParquetBackend`] that means every part
//! flushed before the failure is complete and readable, rows still buffered in
//! memory are lost, and `store.json` is missing.

pub mod columns;
mod config;
mod error;
mod memory;
mod parquet;
mod stats;

use std::collections::BTreeMap;

use log::debug;

pub use config::{CompressionType, StoreConfig};
pub use error::StoreError;
pub use memory::{MemoryBackend, MemoryChannel};
pub use parquet::{
    channel_parts, read_channel, read_manifest, summarize_channel, ChannelSummary,
    ManifestChannel, ParquetBackend, ParquetChannel, StoreManifest, MANIFEST_FILE_NAME,
    STORE_FORMAT_VERSION,
};
pub use stats::{ChannelStats, StoreStats};

use crate::reader::SpikeChunk;

/// Geometry shared by every channel of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLayout {
    /// Samples per waveform row
    pub wave_width: usize,
    /// Rows per storage chunk
    pub chunk_rows: usize,
}

impl StoreLayout {
    /// Layout for a source with the given native spike chunk
    pub fn new(wave_width: usize, native_chunk: usize, config: &StoreConfig) -> Self {
        Self {
            wave_width,
            chunk_rows: config.chunk_rows(native_chunk),
        }
    }
}

/// Handle to a channel that exists in a [`ChannelStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelHandle(u32);

impl ChannelHandle {
    /// Channel id this handle refers to
    pub fn channel_id(&self) -> u32 {
        self.0
    }
}

/// The growable arrays of one channel
pub trait ChannelArrays {
    /// Append spikes. `waveforms` holds `times.len()` rows, flattened.
    fn append(&mut self, times: &[f64], waveforms: &[f64]) -> Result<(), StoreError>;

    /// Rows stored so far
    fn len(&self) -> usize;

    /// Whether nothing has been stored yet
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the arrays, flushing any buffered rows
    fn finish(self) -> Result<ChannelStats, StoreError>;
}

/// Creates the arrays of new channels
pub trait StoreBackend {
    /// Arrays produced for each channel
    type Arrays: ChannelArrays;

    /// Create empty arrays for `channel_id`
    fn create(&mut self, channel_id: u32, layout: &StoreLayout)
        -> Result<Self::Arrays, StoreError>;

    /// Called once after every channel is finished
    fn finalize(&mut self, _stats: &StoreStats) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Set of per-channel stores keyed by channel id
pub struct ChannelStore<B: StoreBackend> {
    backend: B,
    layout: StoreLayout,
    channels: BTreeMap<u32, B::Arrays>,
}

impl<B: StoreBackend> ChannelStore<B> {
    /// Create an empty store
    pub fn new(backend: B, layout: StoreLayout) -> Self {
        Self {
            backend,
            layout,
            channels: BTreeMap::new(),
        }
    }

    /// Geometry of this store
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// The backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Return the handle of `channel_id`, creating its arrays if absent
    pub fn ensure(&mut self, channel_id: u32) -> Result<ChannelHandle, StoreError> {
        if !self.channels.contains_key(&channel_id) {
            debug!("Creating store for channel {}", channel_id);
            let arrays = self.backend.create(channel_id, &self.layout)?;
            self.channels.insert(channel_id, arrays);
        }
        Ok(ChannelHandle(channel_id))
    }

    /// Append spikes to a channel, preserving argument order
    pub fn append(
        &mut self,
        handle: ChannelHandle,
        times: &[f64],
        waveforms: &[f64],
    ) -> Result<(), StoreError> {
        if waveforms.len() != times.len() * self.layout.wave_width {
            return Err(StoreError::InvalidData(format!(
                "{} waveform samples for {} spikes of width {}",
                waveforms.len(),
                times.len(),
                self.layout.wave_width
            )));
        }
        let arrays = self
            .channels
            .get_mut(&handle.0)
            .ok_or(StoreError::UnknownChannel(handle.0))?;
        arrays.append(times, waveforms)
    }

    /// Append every spike of `chunk` to a channel
    pub fn append_chunk(
        &mut self,
        handle: ChannelHandle,
        chunk: &SpikeChunk,
    ) -> Result<(), StoreError> {
        self.append(handle, &chunk.times, &chunk.waveforms)
    }

    /// Arrays of a channel, if it exists
    pub fn channel(&self, channel_id: u32) -> Option<&B::Arrays> {
        self.channels.get(&channel_id)
    }

    /// Ids of all existing channels, ascending
    pub fn channel_ids(&self) -> Vec<u32> {
        self.channels.keys().copied().collect()
    }

    /// Rows stored for a channel (0 if it does not exist)
    pub fn rows(&self, channel_id: u32) -> usize {
        self.channels.get(&channel_id).map_or(0, ChannelArrays::len)
    }

    /// Close every channel and finalize the backend
    pub fn finish(mut self) -> Result<StoreStats, StoreError> {
        let mut stats = StoreStats {
            channels: Vec::with_capacity(self.channels.len()),
            wave_width: self.layout.wave_width,
            chunk_rows: self.layout.chunk_rows,
        };
        for (_, arrays) in std::mem::take(&mut self.channels) {
            stats.channels.push(arrays.finish()?);
        }
        self.backend.finalize(&stats)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> StoreLayout {
        StoreLayout {
            wave_width: 2,
            chunk_rows: 2,
        }
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let mut store = ChannelStore::new(MemoryBackend::new(), layout());
        let first = store.ensure(3).unwrap();
        store.append(first, &[0.1], &[1.0, 2.0]).unwrap();
        let second = store.ensure(3).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.channel_ids(), vec![3]);
        assert_eq!(store.rows(3), 1);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = ChannelStore::new(MemoryBackend::new(), layout());
        let handle = store.ensure(1).unwrap();
        store.append(handle, &[0.1, 0.2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        store.append(handle, &[0.3], &[5.0, 6.0]).unwrap();

        let channel = store.channel(1).unwrap();
        assert_eq!(channel.times(), &[0.1, 0.2, 0.3]);
        assert_eq!(channel.waveform(2), &[5.0, 6.0]);
        assert_eq!(channel.chunks(), 2);
    }

    #[test]
    fn test_append_rejects_ragged_waveforms() {
        let mut store = ChannelStore::new(MemoryBackend::new(), layout());
        let handle = store.ensure(1).unwrap();
        let result = store.append(handle, &[0.1, 0.2], &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert_eq!(store.rows(1), 0);
    }

    #[test]
    fn test_append_unknown_channel() {
        let mut store = ChannelStore::new(MemoryBackend::new(), layout());
        let handle = store.ensure(1).unwrap();
        let mut other = ChannelStore::new(MemoryBackend::new(), layout());
        let result = other.append(handle, &[0.1], &[1.0, 2.0]);
        assert!(matches!(result, Err(StoreError::UnknownChannel(1))));
    }

    #[test]
    fn test_finish_reports_channels() {
        let mut store = ChannelStore::new(MemoryBackend::new(), layout());
        for id in [5, 2] {
            let handle = store.ensure(id).unwrap();
            store.append(handle, &[0.0; 3], &[0.0; 6]).unwrap();
        }
        let stats = store.finish().unwrap();

        assert_eq!(stats.total_rows(), 6);
        assert_eq!(
            stats.channels,
            vec![
                ChannelStats {
                    channel_id: 2,
                    rows: 3,
                    chunks: 2
                },
                ChannelStats {
                    channel_id: 5,
                    rows: 3,
                    chunks: 2
                },
            ]
        );
    }

    #[test]
    fn test_layout_from_native_chunk() {
        let layout = StoreLayout::new(32, 1024, &StoreConfig::default());
        assert_eq!(layout.chunk_rows, 64);
        assert_eq!(layout.wave_width, 32);
    }
}
