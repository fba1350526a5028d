//! # Physical Unit Decoders
//!
//! Converts quantized sample codes stored in event files into physical units.
//!
//! - Spike times are stored as frame indices and decode to seconds.
//! - Waveform samples are stored as ADC codes and decode to volts (in the
//!   recording's unit, usually µV).
//!
//! Decoders are stateless once built and operate on whole chunks.

use crate::source::RecordingVars;

/// A pure transform from one raw chunk to its decoded form.
pub trait Decoder {
    /// Element type of the raw chunk
    type Raw;
    /// Element type produced by decoding
    type Decoded;

    /// Decode a full chunk. The output has the same length as the input.
    fn decode(&self, raw: &[Self::Raw]) -> Vec<Self::Decoded>;
}

/// Decodes frame indices to seconds using the sampling rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDecoder {
    sampling_rate: f64,
}

impl TimeDecoder {
    /// Create a decoder for the given sampling rate in Hz
    pub fn new(sampling_rate: f64) -> Self {
        Self { sampling_rate }
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Decode a single frame index
    #[inline]
    pub fn decode_one(&self, raw: u64) -> f64 {
        raw as f64 / self.sampling_rate
    }
}

impl Decoder for TimeDecoder {
    type Raw = u64;
    type Decoded = f64;

    fn decode(&self, raw: &[u64]) -> Vec<f64> {
        raw.iter().map(|&t| self.decode_one(t)).collect()
    }
}

/// Decodes ADC codes to potentials.
///
/// `volts = (s * code - q_levels / 2) * voltage_step` where `s` is `-1` for an
/// inverted recording and `+1` otherwise. Inversion always applies to the raw
/// code, before the mid-scale offset is removed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformDecoder {
    min_volt: f64,
    max_volt: f64,
    bit_depth: u32,
    inversion: bool,
}

impl WaveformDecoder {
    /// Create a decoder from the recording's quantization parameters
    pub fn new(min_volt: f64, max_volt: f64, bit_depth: u32, inversion: bool) -> Self {
        Self {
            min_volt,
            max_volt,
            bit_depth,
            inversion,
        }
    }

    /// Number of quantization levels, `2^bit_depth`
    pub fn q_levels(&self) -> f64 {
        2f64.powi(self.bit_depth as i32)
    }

    /// Potential difference between two adjacent quantization levels
    pub fn voltage_step(&self) -> f64 {
        (self.max_volt - self.min_volt) / self.q_levels()
    }

    /// Whether raw codes are negated before decoding
    pub fn is_inverted(&self) -> bool {
        self.inversion
    }

    /// Decode a single ADC code
    #[inline]
    pub fn decode_one(&self, raw: i32) -> f64 {
        let sign = if self.inversion { -1.0 } else { 1.0 };
        (sign * raw as f64 - self.q_levels() / 2.0) * self.voltage_step()
    }
}

impl Decoder for WaveformDecoder {
    type Raw = i32;
    type Decoded = f64;

    fn decode(&self, raw: &[i32]) -> Vec<f64> {
        // Constants hoisted out of the per-sample loop
        let sign = if self.inversion { -1.0 } else { 1.0 };
        let offset = self.q_levels() / 2.0;
        let step = self.voltage_step();
        raw.iter()
            .map(|&code| (sign * code as f64 - offset) * step)
            .collect()
    }
}

impl From<&RecordingVars> for TimeDecoder {
    fn from(vars: &RecordingVars) -> Self {
        Self::new(vars.sampling_rate)
    }
}

impl From<&RecordingVars> for WaveformDecoder {
    fn from(vars: &RecordingVars) -> Self {
        Self::new(
            vars.min_volt,
            vars.max_volt,
            vars.bit_depth,
            vars.signal_inversion,
        )
    }
}
