//! # spikedemux - Spike Event Demultiplexing for Multi-Electrode Recordings
//!
//! Multi-electrode array results files store every detected spike in four
//! parallel arrays: spike times, channel ids, unit ids and a flattened block of
//! waveform snippets. Spikes from all channels are interleaved in time order
//! and recordings are routinely larger than memory.
//!
//! `spikedemux` reads those arrays in chunks aligned to their storage layout,
//! decodes them to physical units and hands them to one of two consumers:
//!
//! - **Demultiplexing**: regroup spikes by channel into one append-only store
//!   per channel (in memory or as Parquet files).
//! - **Text export**: write the spikes of one channel group to plain-text
//!   files, one pair per `(channel, unit)`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spikedemux::container::RecordingFile;
//! use spikedemux::demux::{DemuxConfig, DemuxEngine, LogProgress};
//! use spikedemux::export::GroupExporter;
//! use spikedemux::source::SyntheticRecording;
//! use spikedemux::store::{ParquetBackend, StoreConfig};
//!
//! let recording = RecordingFile::open(SyntheticRecording::default().generate())?
//!     .into_results()?;
//!
//! // One Parquet file per channel
//! let backend = ParquetBackend::create("spikes.store", StoreConfig::default())?;
//! let mut engine = DemuxEngine::new(DemuxConfig::default());
//! engine.on_progress(LogProgress::every(10));
//! let (demux_stats, store_stats) = engine.run(&recording, backend)?.finish()?;
//! println!("{}\n{}", demux_stats, store_stats);
//!
//! // Text files for one channel group
//! let stats = GroupExporter::new(&recording, "Group 1", "spikes_txt")?.export()?;
//! println!("{}", stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This creates:
//! ```text
//! spikes.store/
//! ├── channels/channel_<id>/part-<n>.parquet   # SpikeTimes, WaveForms
//! └── store.json                               # manifest
//! spikes_txt/
//! ├── <label>_unit_<unit>.txt
//! └── <label>_unit_<unit>_waves.txt
//! ```
//!
//! ## Architecture
//!
//! - [`source`]: the event source abstraction and an in-memory implementation
//! - [`container`]: container kind probing from the file description
//! - [`decode`]: raw codes to seconds and volts
//! - [`reader`]: chunk-aligned cursors and the lock-step spike stream
//! - [`store`]: per-channel append-only stores
//! - [`demux`]: the channel demultiplexing pass
//! - [`export`]: the streaming text exporter

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod container;
pub mod decode;
pub mod demux;
pub mod export;
pub mod reader;
pub mod source;
pub mod store;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::container::{ContainerKind, RecordingFile};
    pub use crate::decode::{Decoder, TimeDecoder, WaveformDecoder};
    pub use crate::demux::{
        DemuxConfig, DemuxEngine, DemuxError, DemuxStats, LogProgress, Progress, ProgressListener,
    };
    pub use crate::export::{format_sci, ExportError, ExportStats, GroupExporter};
    pub use crate::reader::{
        EventStreamReader, ReadError, ReaderConfig, SpikeChunk, SpikeRecord,
    };
    pub use crate::source::{
        ChannelGroup, EventSource, MemoryRecording, RecordingVars, SourceError,
        SyntheticRecording,
    };
    pub use crate::store::{
        ChannelArrays, ChannelStore, MemoryBackend, ParquetBackend, StoreBackend, StoreConfig,
        StoreError, StoreStats,
    };
}
