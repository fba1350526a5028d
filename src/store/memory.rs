use super::{ChannelArrays, ChannelStats, StoreBackend, StoreError, StoreLayout};

/// Backend keeping every channel in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    created: usize,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of channels created so far
    pub fn created(&self) -> usize {
        self.created
    }
}

impl StoreBackend for MemoryBackend {
    type Arrays = MemoryChannel;

    fn create(
        &mut self,
        channel_id: u32,
        layout: &StoreLayout,
    ) -> Result<MemoryChannel, StoreError> {
        self.created += 1;
        Ok(MemoryChannel::from_parts(
            channel_id,
            Vec::new(),
            Vec::new(),
            layout.wave_width,
            layout.chunk_rows,
        ))
    }
}

/// In-memory `SpikeTimes` and `WaveForms` arrays of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryChannel {
    channel_id: u32,
    times: Vec<f64>,
    waveforms: Vec<f64>,
    wave_width: usize,
    chunk_rows: usize,
}

impl MemoryChannel {
    pub(super) fn from_parts(
        channel_id: u32,
        times: Vec<f64>,
        waveforms: Vec<f64>,
        wave_width: usize,
        chunk_rows: usize,
    ) -> Self {
        Self {
            channel_id,
            times,
            waveforms,
            wave_width,
            chunk_rows,
        }
    }

    /// Channel id
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Spike times in append order
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Waveforms, flattened row-major
    pub fn waveforms(&self) -> &[f64] {
        &self.waveforms
    }

    /// Waveform of row `index`
    pub fn waveform(&self, index: usize) -> &[f64] {
        let start = index * self.wave_width;
        &self.waveforms[start..start + self.wave_width]
    }

    /// Samples per waveform
    pub fn wave_width(&self) -> usize {
        self.wave_width
    }

    /// Chunks the rows occupy at the store's chunk length
    pub fn chunks(&self) -> usize {
        self.times.len().div_ceil(self.chunk_rows)
    }
}

impl ChannelArrays for MemoryChannel {
    fn append(&mut self, times: &[f64], waveforms: &[f64]) -> Result<(), StoreError> {
        self.times.extend_from_slice(times);
        self.waveforms.extend_from_slice(waveforms);
        Ok(())
    }

    fn len(&self) -> usize {
        self.times.len()
    }

    fn finish(self) -> Result<ChannelStats, StoreError> {
        Ok(ChannelStats {
            channel_id: self.channel_id,
            rows: self.times.len(),
            chunks: self.chunks(),
        })
    }
}
