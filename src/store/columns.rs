//! Column names and schema of a channel store file

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use parquet::schema::types::ColumnPath;

/// Spike times in seconds
pub const SPIKE_TIMES: &str = "SpikeTimes";
/// Waveform snippets, one fixed-size list per spike
pub const WAVE_FORMS: &str = "WaveForms";
/// Element field of the waveform lists
pub const WAVE_SAMPLE: &str = "item";

/// Footer key holding the channel id
pub const CHANNEL_ID_KEY: &str = "spikedemux:channel_id";
/// Footer key holding the waveform width
pub const WAVE_WIDTH_KEY: &str = "spikedemux:wave_width";
/// Footer key holding the source description
pub const SOURCE_KEY: &str = "spikedemux:source";

/// Field of a single waveform sample
pub fn wave_sample_field() -> Arc<Field> {
    Arc::new(Field::new(WAVE_SAMPLE, DataType::Float64, false))
}

/// Arrow schema of a channel store holding waveforms of `wave_width` samples
pub fn channel_schema(wave_width: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(SPIKE_TIMES, DataType::Float64, false),
        Field::new(
            WAVE_FORMS,
            DataType::FixedSizeList(wave_sample_field(), wave_width as i32),
            false,
        ),
    ]))
}

pub(super) fn spike_times_path() -> ColumnPath {
    ColumnPath::new(vec![SPIKE_TIMES.to_string()])
}

pub(super) fn wave_forms_path() -> ColumnPath {
    ColumnPath::new(vec![
        WAVE_FORMS.to_string(),
        "list".to_string(),
        WAVE_SAMPLE.to_string(),
    ])
}
