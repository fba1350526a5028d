//! # Event Sources
//!
//! The recording container is an external collaborator. This module describes
//! what the demultiplexer needs from it:
//!
//! - recording-level scalars used for physical-unit decoding ([`RecordingVars`])
//! - the four parallel spike arrays, each readable by range and aware of its
//!   native storage chunk length ([`RawArray`])
//! - the channel label table and the channel groups
//!
//! [`MemoryRecording`] is an in-memory implementation used for synthetic data.

mod channels;
mod error;
mod memory;

use std::ops::Range;

pub use channels::{Channel, ChannelGroup};
pub use error::{KeyKind, SourceError};
pub use memory::{MemoryArray, MemoryRecording, MemoryRecordingBuilder, SyntheticRecording};

/// Recording variables needed to decode raw codes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingVars {
    /// Lower bound of the ADC input range
    pub min_volt: f64,
    /// Upper bound of the ADC input range
    pub max_volt: f64,
    /// ADC resolution in bits
    pub bit_depth: u32,
    /// Whether the acquisition system inverted the signal polarity
    pub signal_inversion: bool,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Number of recorded frames per channel
    pub n_frames: u64,
}

impl RecordingVars {
    /// Normalise a `±1` inversion multiplier, as stored by some acquisition
    /// versions, to the boolean form. Negative multipliers mean inverted.
    pub fn inversion_from_multiplier(multiplier: f64) -> bool {
        multiplier < 0.0
    }

    /// Recording duration in seconds
    pub fn duration(&self) -> f64 {
        self.n_frames as f64 / self.sampling_rate
    }
}

impl Default for RecordingVars {
    fn default() -> Self {
        // 12-bit ADC over ±4125 µV at 17.86 kHz
        Self {
            min_volt: -4125.0,
            max_volt: 4125.0,
            bit_depth: 12,
            signal_inversion: false,
            sampling_rate: 17_855.5,
            n_frames: 0,
        }
    }
}

/// A stored array readable by index range.
pub trait RawArray<T> {
    /// Shape of the stored array
    fn shape(&self) -> &[usize];

    /// Native storage chunk length along the first axis
    fn chunk_len(&self) -> usize;

    /// Read elements `range` of the flattened array
    fn read(&self, range: Range<usize>) -> Result<Vec<T>, SourceError>;

    /// Total number of elements
    fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Whether the array holds no elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An opened results file exposing its spike event arrays.
pub trait EventSource {
    /// Free-text description attribute identifying the container kind
    fn description(&self) -> &str;

    /// Recording variables used for decoding
    fn recording_vars(&self) -> Result<RecordingVars, SourceError>;

    /// Spike times in frames
    fn spike_times(&self) -> &dyn RawArray<u64>;

    /// Channel id of each spike
    fn spike_channels(&self) -> &dyn RawArray<u32>;

    /// Unit id of each spike
    fn spike_units(&self) -> &dyn RawArray<u32>;

    /// Flattened spike waveforms
    fn spike_forms(&self) -> &dyn RawArray<i32>;

    /// Channel id to label table, indexed by channel id
    fn channel_labels(&self) -> Result<Vec<String>, SourceError>;

    /// All channel groups defined in the file
    fn channel_groups(&self) -> Result<Vec<ChannelGroup>, SourceError>;

    /// Names of all channel groups
    fn channel_group_names(&self) -> Result<Vec<String>, SourceError> {
        Ok(self
            .channel_groups()?
            .into_iter()
            .map(|group| group.name().to_string())
            .collect())
    }

    /// Look up a channel group by name
    fn channel_group(&self, name: &str) -> Result<ChannelGroup, SourceError> {
        self.channel_groups()?
            .into_iter()
            .find(|group| group.name() == name)
            .ok_or_else(|| SourceError::missing(KeyKind::ChannelGroup, name))
    }

    /// Look up the label of a channel id
    fn channel_label(&self, channel_id: u32) -> Result<String, SourceError> {
        self.channel_labels()?
            .into_iter()
            .nth(channel_id as usize)
            .ok_or_else(|| SourceError::missing(KeyKind::Channel, channel_id))
    }
}
