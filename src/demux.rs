//! # Channel Demultiplexing
//!
//! A results file stores spikes from every channel interleaved in time order.
//! [`DemuxEngine`] streams them chunk by chunk and regroups each chunk by
//! channel, appending the selected spikes to that channel's store. Within a
//! channel the relative read order of spikes is preserved.
//!
//! ```rust
//! use spikedemux::demux::{DemuxConfig, DemuxEngine};
//! use spikedemux::source::SyntheticRecording;
//! use spikedemux::store::MemoryBackend;
//!
//! let recording = SyntheticRecording {
//!     n_spikes: 1_000,
//!     n_channels: 4,
//!     ..Default::default()
//! }
//! .generate();
//!
//! let mut engine = DemuxEngine::new(DemuxConfig::default());
//! let result = engine.run(&recording, MemoryBackend::new())?;
//! assert_eq!(result.stats.spikes_written, 1_000);
//! # Ok::<(), spikedemux::demux::DemuxError>(())
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::ops::ControlFlow;

use log::{info, warn};

use crate::reader::{EventStreamReader, ReadError, ReaderConfig, SpikeChunk};
use crate::source::EventSource;
use crate::store::{ChannelStore, StoreBackend, StoreConfig, StoreError, StoreLayout, StoreStats};

/// Errors that can occur during a demultiplexing pass
#[derive(Debug, thiserror::Error)]
pub enum DemuxError {
    /// Error reading the source arrays
    #[error("Read error: {0}")]
    ReadError(#[from] ReadError),

    /// Error writing a channel store
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

/// Pass progress in chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Chunks processed so far
    pub current: u64,
    /// Chunks in the pass
    pub total: u64,
}

impl Progress {
    /// Completed fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Receives progress of a pass and may cancel it
pub trait ProgressListener {
    /// Called before the first chunk and after every chunk.
    /// Returning [`ControlFlow::Break`] stops the pass after the current chunk.
    fn on_progress(&mut self, progress: &Progress) -> ControlFlow<()>;
}

impl<F> ProgressListener for F
where
    F: FnMut(&Progress) -> ControlFlow<()>,
{
    fn on_progress(&mut self, progress: &Progress) -> ControlFlow<()> {
        self(progress)
    }
}

/// Listener logging progress through `log`
#[derive(Debug, Clone)]
pub struct LogProgress {
    every: u64,
}

impl LogProgress {
    /// Log every `every` chunks, and always the last one
    pub fn every(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::every(1)
    }
}

impl ProgressListener for LogProgress {
    fn on_progress(&mut self, progress: &Progress) -> ControlFlow<()> {
        if progress.current % self.every == 0 || progress.current == progress.total {
            info!(
                "Progress: {}/{} chunks ({:.1}%)",
                progress.current,
                progress.total,
                progress.fraction() * 100.0
            );
        }
        ControlFlow::Continue(())
    }
}

/// Configuration for a demultiplexing pass
#[derive(Debug, Clone, Default)]
pub struct DemuxConfig {
    /// How the source is chunked
    pub reader: ReaderConfig,
    /// How channel stores are chunked and compressed
    pub store: StoreConfig,
    /// Create a store for every labelled channel before streaming,
    /// including channels without spikes
    pub eager_channels: bool,
}

/// Statistics from a demultiplexing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Chunks processed
    pub chunks: u64,
    /// Spikes read from the source
    pub spikes_read: usize,
    /// Spikes appended to channel stores
    pub spikes_written: usize,
    /// Distinct channels that received spikes
    pub channels_touched: usize,
    /// Whether a listener stopped the pass early
    pub cancelled: bool,
}

impl fmt::Display for DemuxStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Demultiplexed {} spikes from {} chunks into {} channels{}",
            self.spikes_written,
            self.chunks,
            self.channels_touched,
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}

/// Output of [`DemuxEngine::run`]: the open store and the pass statistics
pub struct Demultiplexed<B: StoreBackend> {
    /// Channel stores, still open for inspection
    pub store: ChannelStore<B>,
    /// Pass statistics
    pub stats: DemuxStats,
}

impl<B: StoreBackend> Demultiplexed<B> {
    /// Close every channel store
    pub fn finish(self) -> Result<(DemuxStats, StoreStats), DemuxError> {
        let store_stats = self.store.finish()?;
        Ok((self.stats, store_stats))
    }
}

/// Streams an event source into per-channel stores
pub struct DemuxEngine<'a> {
    config: DemuxConfig,
    listeners: Vec<Box<dyn ProgressListener + 'a>>,
}

impl<'a> DemuxEngine<'a> {
    /// Create an engine with no listeners
    pub fn new(config: DemuxConfig) -> Self {
        Self {
            config,
            listeners: Vec::new(),
        }
    }

    /// Register a progress listener
    pub fn on_progress(&mut self, listener: impl ProgressListener + 'a) -> &mut Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Configuration of this engine
    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    /// Run one pass over `source`, creating channel stores through `backend`.
    ///
    /// The pass is not transactional: on error, spikes already appended stay
    /// in their stores.
    pub fn run<S, B>(&mut self, source: &S, backend: B) -> Result<Demultiplexed<B>, DemuxError>
    where
        S: EventSource + ?Sized,
        B: StoreBackend,
    {
        let reader = EventStreamReader::new(source, self.config.reader)?;
        let layout = StoreLayout::new(
            reader.wave_width(),
            reader.native_chunk_len(),
            &self.config.store,
        );
        let mut store = ChannelStore::new(backend, layout);

        if self.config.eager_channels && reader.spike_count() > 0 {
            let labels = source.channel_labels().map_err(ReadError::from)?;
            for channel_id in 0..labels.len() as u32 {
                store.ensure(channel_id)?;
            }
        }

        let total = reader.chunk_count() as u64;
        info!(
            "Demultiplexing {} spikes in {} chunks of {} (waveform width {})",
            reader.spike_count(),
            total,
            reader.spike_chunk(),
            reader.wave_width()
        );

        let mut stats = DemuxStats::default();
        let mut touched = BTreeSet::new();
        if self.notify(Progress { current: 0, total }).is_break() {
            stats.cancelled = true;
        }

        if !stats.cancelled {
            for chunk in reader {
                let chunk = chunk?;
                stats.spikes_read += chunk.len();
                touched.extend(chunk.channel_ids.iter().copied());
                stats.spikes_written += append_grouped(&chunk, &mut store)?;
                stats.chunks += 1;

                let progress = Progress {
                    current: stats.chunks,
                    total,
                };
                if self.notify(progress).is_break() {
                    stats.cancelled = true;
                    break;
                }
            }
        }
        stats.channels_touched = touched.len();

        if stats.cancelled {
            warn!("Demultiplexing cancelled after {}/{} chunks", stats.chunks, total);
        }
        info!("{}", stats);

        Ok(Demultiplexed { store, stats })
    }

    fn notify(&mut self, progress: Progress) -> ControlFlow<()> {
        let mut flow = ControlFlow::Continue(());
        for listener in &mut self.listeners {
            if listener.on_progress(&progress).is_break() {
                flow = ControlFlow::Break(());
            }
        }
        flow
    }
}

/// Append each spike of `chunk` to the store of its channel.
///
/// Channels are visited in order of first appearance in the chunk. Returns
/// the number of spikes appended.
pub fn append_grouped<B: StoreBackend>(
    chunk: &SpikeChunk,
    store: &mut ChannelStore<B>,
) -> Result<usize, StoreError> {
    let mut written = 0;
    for channel_id in chunk.distinct_channels() {
        let selected = chunk.select(&chunk.channel_mask(channel_id));
        let handle = store.ensure(channel_id)?;
        store.append_chunk(handle, &selected)?;
        written += selected.len();
    }
    Ok(written)
}
