use std::fmt;

/// Statistics of one finished channel stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    /// Channel id
    pub channel_id: u32,
    /// Spikes stored
    pub rows: usize,
    /// Storage chunks (row groups) holding them
    pub chunks: usize,
}

/// Statistics from a finished store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Per-channel statistics in channel id order
    pub channels: Vec<ChannelStats>,
    /// Samples per stored waveform
    pub wave_width: usize,
    /// Rows per storage chunk
    pub chunk_rows: usize,
}

impl StoreStats {
    /// Total spikes stored across channels
    pub fn total_rows(&self) -> usize {
        self.channels.iter().map(|c| c.rows).sum()
    }
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stored {} spikes across {} channels (waveform width {}, {} rows per chunk)",
            self.total_rows(),
            self.channels.len(),
            self.wave_width,
            self.chunk_rows
        )
    }
}
