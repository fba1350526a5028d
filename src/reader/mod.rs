//! # Spike Event Reader
//!
//! Streams the parallel spike arrays of a results file in blocks aligned to
//! their storage chunks, decoding times to seconds and waveforms to volts.
//!
//! ## Design
//!
//! Reading with a block size unrelated to the storage chunks makes every read
//! touch (and decompress) up to two storage chunks per array. The reader
//! therefore sizes its blocks as a whole multiple of the native spike chunk and
//! scales the waveform block by the waveform width, so that all four arrays
//! advance over the same spikes in every step.
//!
//! ```rust
//! use spikedemux::reader::{EventStreamReader, ReaderConfig};
//! use spikedemux::source::SyntheticRecording;
//!
//! let recording = SyntheticRecording { n_spikes: 2_000, ..Default::default() }.generate();
//! let reader = EventStreamReader::new(&recording, ReaderConfig::default())?;
//! assert_eq!(reader.chunk_count(), 2);
//!
//! for spike in reader.spikes() {
//!     let spike = spike?;
//!     assert_eq!(spike.waveform.len(), 32);
//! }
//! # Ok::<(), spikedemux::reader::ReadError>(())
//! ```

mod cursor;
mod error;
mod events;

#[cfg(test)]
mod tests;

pub use cursor::{ChunkCursor, DecodedChunks};
pub use error::ReadError;
pub use events::{EventStreamReader, SpikeChunk, SpikeRecord, Spikes};

/// Configuration for streaming spike events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Native storage chunks read per step
    pub chunk_multiplier: usize,

    /// Stop after this many chunks (None = read everything).
    /// Intended for profiling and debugging on large recordings.
    pub max_chunks: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_multiplier: 1,
            max_chunks: None,
        }
    }
}

impl ReaderConfig {
    /// Read `multiplier` native chunks per step
    pub fn with_chunk_multiplier(mut self, multiplier: usize) -> Self {
        self.chunk_multiplier = multiplier;
        self
    }

    /// Truncate the stream after `max_chunks` chunks
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = Some(max_chunks);
        self
    }
}
