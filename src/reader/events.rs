use super::cursor::{ChunkCursor, DecodedChunks};
use super::{ReadError, ReaderConfig};
use crate::decode::{TimeDecoder, WaveformDecoder};
use crate::source::{EventSource, RecordingVars};

/// One decoded spike
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeRecord {
    /// Spike time in seconds
    pub time: f64,
    /// Waveform snippet in volts
    pub waveform: Vec<f64>,
    /// Recording channel
    pub channel_id: u32,
    /// Sorted unit
    pub unit_id: u32,
}

/// A decoded chunk of spikes in columnar layout.
///
/// `waveforms` is row-major with `wave_width` samples per spike, so spike `i`
/// owns `waveforms[i * wave_width..(i + 1) * wave_width]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeChunk {
    /// Spike times in seconds
    pub times: Vec<f64>,
    /// Flattened waveforms in volts
    pub waveforms: Vec<f64>,
    /// Channel id per spike
    pub channel_ids: Vec<u32>,
    /// Unit id per spike
    pub unit_ids: Vec<u32>,
    wave_width: usize,
}

impl SpikeChunk {
    /// Assemble a chunk, checking that all columns describe the same spikes
    pub fn new(
        times: Vec<f64>,
        waveforms: Vec<f64>,
        channel_ids: Vec<u32>,
        unit_ids: Vec<u32>,
        wave_width: usize,
    ) -> Result<Self, ReadError> {
        let n = times.len();
        if channel_ids.len() != n || unit_ids.len() != n || waveforms.len() != n * wave_width {
            return Err(ReadError::CorruptedData(format!(
                "chunk columns disagree: {} times, {} channels, {} units, {} samples (width {})",
                n,
                channel_ids.len(),
                unit_ids.len(),
                waveforms.len(),
                wave_width
            )));
        }

        Ok(Self {
            times,
            waveforms,
            channel_ids,
            unit_ids,
            wave_width,
        })
    }

    /// Number of spikes
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the chunk holds no spikes
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Samples per waveform
    pub fn wave_width(&self) -> usize {
        self.wave_width
    }

    /// Waveform of spike `index`
    pub fn waveform(&self, index: usize) -> &[f64] {
        let start = index * self.wave_width;
        &self.waveforms[start..start + self.wave_width]
    }

    /// Copy spike `index` out as a record
    pub fn record(&self, index: usize) -> SpikeRecord {
        SpikeRecord {
            time: self.times[index],
            waveform: self.waveform(index).to_vec(),
            channel_id: self.channel_ids[index],
            unit_id: self.unit_ids[index],
        }
    }

    /// Distinct channel ids in order of first appearance
    pub fn distinct_channels(&self) -> Vec<u32> {
        let mut seen = Vec::new();
        for &id in &self.channel_ids {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    /// Row mask selecting the spikes recorded on `channel_id`
    pub fn channel_mask(&self, channel_id: u32) -> Vec<bool> {
        self.channel_ids.iter().map(|&id| id == channel_id).collect()
    }

    /// Rows selected by `mask`, in their original relative order
    pub fn select(&self, mask: &[bool]) -> SpikeChunk {
        let selected = mask.iter().filter(|&&keep| keep).count();
        let mut out = SpikeChunk {
            times: Vec::with_capacity(selected),
            waveforms: Vec::with_capacity(selected * self.wave_width),
            channel_ids: Vec::with_capacity(selected),
            unit_ids: Vec::with_capacity(selected),
            wave_width: self.wave_width,
        };

        for (index, _) in mask.iter().enumerate().filter(|(_, &keep)| keep) {
            out.times.push(self.times[index]);
            out.waveforms.extend_from_slice(self.waveform(index));
            out.channel_ids.push(self.channel_ids[index]);
            out.unit_ids.push(self.unit_ids[index]);
        }
        out
    }
}

/// Streams the spike arrays of an event source as decoded [`SpikeChunk`]s.
///
/// Four cursors advance in lock-step over the same spike range: times,
/// channel ids and unit ids read `spike_chunk` elements per step, the
/// waveform cursor reads `spike_chunk * wave_width` samples. The reader is an
/// iterator and is consumed by reading; re-reading needs a new reader. The
/// stream ends after the first error.
pub struct EventStreamReader<'a> {
    times: DecodedChunks<'a, u64, TimeDecoder>,
    forms: DecodedChunks<'a, i32, WaveformDecoder>,
    channels: ChunkCursor<'a, u32>,
    units: ChunkCursor<'a, u32>,
    vars: RecordingVars,
    wave_width: usize,
    spike_count: usize,
    spike_chunk: usize,
    native_chunk: usize,
    chunk_count: usize,
    chunks_read: usize,
    done: bool,
}

impl<'a> EventStreamReader<'a> {
    /// Open a stream over `source`.
    ///
    /// Fails with [`ReadError::CorruptedData`] when the parallel arrays
    /// disagree in length or the waveform samples are not a whole number of
    /// waveforms, and with [`ReadError::UnsupportedInput`] when an array is
    /// not 1-D.
    pub fn new<S>(source: &'a S, config: ReaderConfig) -> Result<Self, ReadError>
    where
        S: EventSource + ?Sized,
    {
        let vars = source.recording_vars()?;
        let times = source.spike_times();
        let channels = source.spike_channels();
        let units = source.spike_units();
        let forms = source.spike_forms();

        let spike_count = times.len();
        if channels.len() != spike_count || units.len() != spike_count {
            return Err(ReadError::CorruptedData(format!(
                "spike arrays disagree in length: {} times, {} channel ids, {} unit ids",
                spike_count,
                channels.len(),
                units.len()
            )));
        }
        let wave_width = infer_wave_width(forms.len(), spike_count)?;

        let native_chunk = times.chunk_len();
        let spike_chunk = native_chunk.saturating_mul(config.chunk_multiplier);
        let times = ChunkCursor::new(times, spike_chunk)?;
        let chunk_count = config
            .max_chunks
            .map_or(times.remaining_chunks(), |max| {
                times.remaining_chunks().min(max)
            });

        Ok(Self {
            times: times.decoded(TimeDecoder::from(&vars)),
            forms: ChunkCursor::new(forms, spike_chunk.saturating_mul(wave_width.max(1)))?
                .decoded(WaveformDecoder::from(&vars)),
            channels: ChunkCursor::new(channels, spike_chunk)?,
            units: ChunkCursor::new(units, spike_chunk)?,
            vars,
            wave_width,
            spike_count,
            spike_chunk,
            native_chunk,
            chunk_count,
            chunks_read: 0,
            done: false,
        })
    }

    /// Samples per waveform
    pub fn wave_width(&self) -> usize {
        self.wave_width
    }

    /// Total spikes in the source
    pub fn spike_count(&self) -> usize {
        self.spike_count
    }

    /// Spikes per chunk
    pub fn spike_chunk(&self) -> usize {
        self.spike_chunk
    }

    /// Native storage chunk length of the spike arrays
    pub fn native_chunk_len(&self) -> usize {
        self.native_chunk
    }

    /// Number of chunks the stream yields, including any truncation
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Recording variables the stream decodes with
    pub fn recording_vars(&self) -> &RecordingVars {
        &self.vars
    }

    /// Flatten the stream into individual spikes in read order
    pub fn spikes(self) -> Spikes<'a> {
        Spikes {
            chunks: self,
            current: None,
            index: 0,
        }
    }

    fn read_chunk(&mut self) -> Option<Result<SpikeChunk, ReadError>> {
        match (
            self.times.next(),
            self.forms.next(),
            self.channels.next(),
            self.units.next(),
        ) {
            (None, None, None, None) => None,
            (Some(times), Some(forms), Some(channels), Some(units)) => {
                Some(assemble(times, forms, channels, units, self.wave_width))
            }
            _ => Some(Err(ReadError::CorruptedData(
                "spike arrays ended out of step".to_string(),
            ))),
        }
    }
}

impl Iterator for EventStreamReader<'_> {
    type Item = Result<SpikeChunk, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.chunks_read >= self.chunk_count {
            return None;
        }
        let chunk = self.read_chunk();
        match &chunk {
            Some(Ok(_)) => self.chunks_read += 1,
            Some(Err(_)) | None => self.done = true,
        }
        chunk
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.chunk_count - self.chunks_read;
        (0, Some(remaining))
    }
}

/// Individual spikes of an [`EventStreamReader`], in read order
pub struct Spikes<'a> {
    chunks: EventStreamReader<'a>,
    current: Option<SpikeChunk>,
    index: usize,
}

impl Iterator for Spikes<'_> {
    type Item = Result<SpikeRecord, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = &self.current {
                if self.index < chunk.len() {
                    let record = chunk.record(self.index);
                    self.index += 1;
                    return Some(Ok(record));
                }
            }
            match self.chunks.next()? {
                Ok(chunk) => {
                    self.current = Some(chunk);
                    self.index = 0;
                }
                Err(e) => {
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn assemble(
    times: Result<Vec<f64>, ReadError>,
    forms: Result<Vec<f64>, ReadError>,
    channels: Result<Vec<u32>, ReadError>,
    units: Result<Vec<u32>, ReadError>,
    wave_width: usize,
) -> Result<SpikeChunk, ReadError> {
    SpikeChunk::new(times?, forms?, channels?, units?, wave_width)
}

/// Samples per waveform, from the flattened sample count and the spike count
fn infer_wave_width(samples: usize, spikes: usize) -> Result<usize, ReadError> {
    if spikes == 0 {
        return if samples == 0 {
            Ok(0)
        } else {
            Err(ReadError::CorruptedData(format!(
                "{} waveform samples but no spikes",
                samples
            )))
        };
    }
    if samples % spikes != 0 {
        return Err(ReadError::CorruptedData(format!(
            "{} waveform samples is not a whole number of waveforms for {} spikes",
            samples, spikes
        )));
    }
    Ok(samples / spikes)
}
