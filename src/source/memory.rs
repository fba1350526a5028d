use std::ops::Range;

use super::{ChannelGroup, EventSource, RawArray, RecordingVars, SourceError};
use crate::container::BXR_DESCRIPTION_PREFIX;

/// A raw array held in memory with an explicit storage chunk length
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryArray<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    chunk_len: usize,
}

impl<T: Clone> MemoryArray<T> {
    /// Create a 1-D array
    pub fn new(data: Vec<T>, chunk_len: usize) -> Self {
        let shape = vec![data.len()];
        Self {
            data,
            shape,
            chunk_len,
        }
    }

    /// Create an array with an explicit shape over row-major `data`
    pub fn with_shape(data: Vec<T>, shape: Vec<usize>, chunk_len: usize) -> Self {
        Self {
            data,
            shape,
            chunk_len,
        }
    }

    /// The stored elements
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Clone> RawArray<T> for MemoryArray<T> {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    fn read(&self, range: Range<usize>) -> Result<Vec<T>, SourceError> {
        self.data
            .get(range.clone())
            .map(<[T]>::to_vec)
            .ok_or(SourceError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: self.data.len(),
            })
    }
}

/// A complete results file held in memory
#[derive(Debug, Clone)]
pub struct MemoryRecording {
    description: String,
    vars: RecordingVars,
    times: MemoryArray<u64>,
    channels: MemoryArray<u32>,
    units: MemoryArray<u32>,
    forms: MemoryArray<i32>,
    labels: Vec<String>,
    groups: Vec<ChannelGroup>,
}

impl MemoryRecording {
    /// Start building a recording
    pub fn builder() -> MemoryRecordingBuilder {
        MemoryRecordingBuilder::default()
    }
}

impl EventSource for MemoryRecording {
    fn description(&self) -> &str {
        &self.description
    }

    fn recording_vars(&self) -> Result<RecordingVars, SourceError> {
        Ok(self.vars)
    }

    fn spike_times(&self) -> &dyn RawArray<u64> {
        &self.times
    }

    fn spike_channels(&self) -> &dyn RawArray<u32> {
        &self.channels
    }

    fn spike_units(&self) -> &dyn RawArray<u32> {
        &self.units
    }

    fn spike_forms(&self) -> &dyn RawArray<i32> {
        &self.forms
    }

    fn channel_labels(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.labels.clone())
    }

    fn channel_groups(&self) -> Result<Vec<ChannelGroup>, SourceError> {
        Ok(self.groups.clone())
    }
}

/// Builder for [`MemoryRecording`]
#[derive(Debug, Clone)]
pub struct MemoryRecordingBuilder {
    description: String,
    vars: RecordingVars,
    chunk_len: usize,
    times: Vec<u64>,
    channels: Vec<u32>,
    units: Vec<u32>,
    forms: Option<MemoryArray<i32>>,
    form_samples: Vec<i32>,
    labels: Option<Vec<String>>,
    groups: Vec<ChannelGroup>,
}

impl Default for MemoryRecordingBuilder {
    fn default() -> Self {
        Self {
            description: format!("{} - in-memory recording", BXR_DESCRIPTION_PREFIX),
            vars: RecordingVars::default(),
            chunk_len: 1024,
            times: Vec::new(),
            channels: Vec::new(),
            units: Vec::new(),
            forms: None,
            form_samples: Vec::new(),
            labels: None,
            groups: Vec::new(),
        }
    }
}

impl MemoryRecordingBuilder {
    /// Set the description attribute
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the recording variables
    pub fn vars(mut self, vars: RecordingVars) -> Self {
        self.vars = vars;
        self
    }

    /// Set the polarity from a `±1` inversion multiplier, as stored by some
    /// acquisition versions. Call after [`Self::vars`].
    pub fn inversion_multiplier(mut self, multiplier: f64) -> Self {
        self.vars.signal_inversion = RecordingVars::inversion_from_multiplier(multiplier);
        self
    }

    /// Native chunk length of the spike arrays
    pub fn chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len;
        self
    }

    /// Spike times in frames
    pub fn times(mut self, times: Vec<u64>) -> Self {
        self.times = times;
        self
    }

    /// Channel id per spike
    pub fn channels(mut self, channels: Vec<u32>) -> Self {
        self.channels = channels;
        self
    }

    /// Unit id per spike
    pub fn units(mut self, units: Vec<u32>) -> Self {
        self.units = units;
        self
    }

    /// Flattened waveform samples
    pub fn forms(mut self, samples: Vec<i32>) -> Self {
        self.form_samples = samples;
        self
    }

    /// Waveform array with an explicit shape and chunking, replacing [`Self::forms`]
    pub fn forms_array(mut self, forms: MemoryArray<i32>) -> Self {
        self.forms = Some(forms);
        self
    }

    /// Channel label table. Defaults to `ch{id}` for every referenced id.
    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Add a channel group
    pub fn group(mut self, group: ChannelGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Assemble the recording
    pub fn build(self) -> MemoryRecording {
        let labels = self.labels.unwrap_or_else(|| {
            let max_id = self.channels.iter().copied().max().map_or(0, |id| id + 1);
            (0..max_id).map(|id| format!("ch{}", id)).collect()
        });
        let spike_chunk = self.chunk_len;
        let forms = self.forms.unwrap_or_else(|| {
            // Keep the waveform chunk proportional to the spike chunk
            let width = self
                .form_samples
                .len()
                .checked_div(self.times.len())
                .unwrap_or(1)
                .max(1);
            MemoryArray::new(self.form_samples, spike_chunk * width)
        });

        MemoryRecording {
            description: self.description,
            vars: self.vars,
            times: MemoryArray::new(self.times, spike_chunk),
            channels: MemoryArray::new(self.channels, spike_chunk),
            units: MemoryArray::new(self.units, spike_chunk),
            forms,
            labels,
            groups: self.groups,
        }
    }
}

/// Deterministic generator for synthetic multi-electrode recordings.
///
/// Spikes are spread round-robin over channels with a rotating unit assignment,
/// and every waveform is a scaled biphasic template, so output is reproducible
/// across runs.
#[derive(Debug, Clone)]
pub struct SyntheticRecording {
    /// Number of spikes
    pub n_spikes: usize,
    /// Number of channels spikes are spread across
    pub n_channels: u32,
    /// Number of distinct units per channel
    pub units_per_channel: u32,
    /// Samples per waveform
    pub wave_width: usize,
    /// Native chunk length of the spike arrays
    pub chunk_len: usize,
}

impl Default for SyntheticRecording {
    fn default() -> Self {
        Self {
            n_spikes: 100_000,
            n_channels: 64,
            units_per_channel: 2,
            wave_width: 32,
            chunk_len: 1024,
        }
    }
}

impl SyntheticRecording {
    /// Name of the channel group covering every generated unit
    pub const ALL_UNITS_GROUP: &'static str = "Group 1";

    /// Generate the recording
    pub fn generate(&self) -> MemoryRecording {
        let vars = RecordingVars {
            n_frames: self.n_spikes as u64 * 10 + 1,
            ..RecordingVars::default()
        };
        let mid_scale = 1i32 << (vars.bit_depth - 1);
        let n_channels = self.n_channels.max(1);
        let units_per_channel = self.units_per_channel.max(1);

        let mut times = Vec::with_capacity(self.n_spikes);
        let mut channels = Vec::with_capacity(self.n_spikes);
        let mut units = Vec::with_capacity(self.n_spikes);
        let mut forms = Vec::with_capacity(self.n_spikes * self.wave_width);

        for i in 0..self.n_spikes {
            let channel = (i as u32 * 7 + i as u32 / 3) % n_channels;
            let unit = channel * units_per_channel + (i as u32 / n_channels) % units_per_channel;
            times.push(i as u64 * 10);
            channels.push(channel);
            units.push(unit);

            let amplitude = 200 + (unit % 13) as i32 * 25;
            for s in 0..self.wave_width {
                let phase = s as f64 / self.wave_width.max(1) as f64;
                let shape = -(std::f64::consts::PI * 2.0 * phase).sin();
                forms.push(mid_scale + (shape * amplitude as f64) as i32);
            }
        }

        let labels = (0..n_channels)
            .map(|id| format!("{}_{}", id / 8 + 1, id % 8 + 1))
            .collect();
        let grid = (0..n_channels)
            .map(|id| super::Channel::new((id / 8) as u16 + 1, (id % 8) as u16 + 1))
            .collect();
        let group = ChannelGroup::new(
            Self::ALL_UNITS_GROUP,
            grid,
            0..n_channels * units_per_channel,
        )
        .with_color("#1F77B4");

        MemoryRecording::builder()
            .vars(vars)
            .chunk_len(self.chunk_len)
            .times(times)
            .channels(channels)
            .units(units)
            .forms(forms)
            .labels(labels)
            .group(group)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_array_read() {
        let array = MemoryArray::new(vec![1u32, 2, 3, 4, 5], 2);
        assert_eq!(array.shape(), &[5]);
        assert_eq!(array.chunk_len(), 2);
        assert_eq!(array.read(1..3).unwrap(), vec![2, 3]);
        assert!(matches!(
            array.read(4..7),
            Err(SourceError::OutOfBounds { len: 5, .. })
        ));
    }

    #[test]
    fn test_builder_defaults_labels() {
        let recording = MemoryRecording::builder()
            .times(vec![0, 1, 2])
            .channels(vec![0, 2, 1])
            .units(vec![0, 0, 0])
            .forms(vec![0; 6])
            .build();

        assert_eq!(recording.channel_labels().unwrap(), vec!["ch0", "ch1", "ch2"]);
        assert_eq!(recording.channel_label(2).unwrap(), "ch2");
        assert!(matches!(
            recording.channel_label(3),
            Err(SourceError::MissingKey { .. })
        ));
        assert_eq!(recording.spike_forms().chunk_len(), 1024 * 2);
    }

    #[test]
    fn test_missing_channel_group() {
        let recording = SyntheticRecording {
            n_spikes: 10,
            ..Default::default()
        }
        .generate();

        assert_eq!(
            recording.channel_group_names().unwrap(),
            vec![SyntheticRecording::ALL_UNITS_GROUP]
        );
        assert!(recording.channel_group("Group 1").is_ok());
        let err = recording.channel_group("Group 2").unwrap_err();
        assert!(matches!(
            err,
            SourceError::MissingKey {
                kind: super::super::KeyKind::ChannelGroup,
                ..
            }
        ));
    }

    #[test]
    fn test_inversion_multiplier() {
        let inverted = MemoryRecording::builder()
            .vars(RecordingVars::default())
            .inversion_multiplier(-1.0)
            .build();
        assert!(inverted.recording_vars().unwrap().signal_inversion);

        let upright = MemoryRecording::builder().inversion_multiplier(1.0).build();
        assert!(!upright.recording_vars().unwrap().signal_inversion);
    }

    #[test]
    fn test_hidden_group() {
        let recording = MemoryRecording::builder()
            .group(ChannelGroup::new("hidden", Vec::new(), [1]).with_visible(false))
            .build();
        let group = recording.channel_group("hidden").unwrap();
        assert!(!group.visible());
        assert_eq!(group.color(), None);
    }

    #[test]
    fn test_synthetic_recording_shape() {
        let generator = SyntheticRecording {
            n_spikes: 500,
            n_channels: 8,
            units_per_channel: 2,
            wave_width: 16,
            chunk_len: 64,
        };
        let recording = generator.generate();

        assert_eq!(recording.spike_times().len(), 500);
        assert_eq!(recording.spike_forms().len(), 500 * 16);
        assert_eq!(recording.channel_labels().unwrap().len(), 8);
        assert_eq!(recording.recording_vars().unwrap().duration(), 5_001.0 / 17_855.5);
        let group = recording
            .channel_group(SyntheticRecording::ALL_UNITS_GROUP)
            .unwrap();
        assert_eq!(group.color(), Some("#1F77B4"));
        assert!(group.visible());
        let channels = recording.spike_channels().read(0..500).unwrap();
        assert!(channels.iter().all(|&c| c < 8));
        let units = recording.spike_units().read(0..500).unwrap();
        for (c, u) in channels.iter().zip(&units) {
            assert_eq!(u / 2, *c);
        }
    }
}
