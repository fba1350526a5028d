use super::*;
use crate::decode::{Decoder, TimeDecoder, WaveformDecoder};
use crate::source::{MemoryArray, MemoryRecording, RecordingVars};

fn vars() -> RecordingVars {
    RecordingVars {
        min_volt: -1.0,
        max_volt: 1.0,
        bit_depth: 3,
        signal_inversion: false,
        sampling_rate: 1000.0,
        n_frames: 10_000,
    }
}

fn ten_spike_recording(chunk_len: usize) -> MemoryRecording {
    MemoryRecording::builder()
        .vars(vars())
        .chunk_len(chunk_len)
        .times((0..10).map(|i| i * 125).collect())
        .channels(vec![1, 2, 1, 3, 2, 1, 1, 2, 3, 3])
        .units(vec![10, 20, 11, 30, 20, 10, 11, 21, 30, 31])
        .forms((0..40).map(|i| i % 8).collect())
        .build()
}

// ==================== Record Stream Tests ====================

#[test]
fn test_records_match_direct_decoding() {
    let recording = ten_spike_recording(4);
    let reader = EventStreamReader::new(&recording, ReaderConfig::default()).unwrap();
    assert_eq!(reader.wave_width(), 4);
    assert_eq!(reader.spike_count(), 10);
    assert_eq!(reader.chunk_count(), 3);

    let records: Vec<SpikeRecord> = reader.spikes().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 10);

    let times = TimeDecoder::from(&vars());
    let waves = WaveformDecoder::from(&vars());
    let raw_times: Vec<u64> = (0..10).map(|i| i * 125).collect();
    let raw_forms: Vec<i32> = (0..40).map(|i| i % 8).collect();
    let channels = [1, 2, 1, 3, 2, 1, 1, 2, 3, 3];
    let units = [10, 20, 11, 30, 20, 10, 11, 21, 30, 31];

    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.time, times.decode_one(raw_times[i]));
        assert_eq!(record.waveform, waves.decode(&raw_forms[i * 4..(i + 1) * 4]));
        assert_eq!(record.channel_id, channels[i]);
        assert_eq!(record.unit_id, units[i]);
    }
}

#[test]
fn test_chunks_are_aligned_across_arrays() {
    let recording = ten_spike_recording(4);
    let chunks: Vec<SpikeChunk> = EventStreamReader::new(&recording, ReaderConfig::default())
        .unwrap()
        .map(|c| c.unwrap())
        .collect();

    let lengths: Vec<usize> = chunks.iter().map(SpikeChunk::len).collect();
    assert_eq!(lengths, vec![4, 4, 2]);
    for chunk in &chunks {
        assert_eq!(chunk.waveforms.len(), chunk.len() * 4);
        assert_eq!(chunk.channel_ids.len(), chunk.len());
        assert_eq!(chunk.unit_ids.len(), chunk.len());
    }
    // Second chunk starts at spike 4: t = 0.5 s, first sample code 0
    assert_eq!(chunks[1].times[0], 0.5);
    assert_eq!(chunks[1].waveform(0), &[-1.0, -0.75, -0.5, -0.25]);
}

#[test]
fn test_chunk_multiplier() {
    let recording = ten_spike_recording(2);
    let config = ReaderConfig::default().with_chunk_multiplier(3);
    let reader = EventStreamReader::new(&recording, config).unwrap();
    assert_eq!(reader.native_chunk_len(), 2);
    assert_eq!(reader.spike_chunk(), 6);
    assert_eq!(reader.chunk_count(), 2);
    assert_eq!(reader.count(), 2);
}

#[test]
fn test_max_chunks_truncates_stream() {
    let recording = ten_spike_recording(2);
    let config = ReaderConfig::default().with_max_chunks(2);
    let reader = EventStreamReader::new(&recording, config).unwrap();
    assert_eq!(reader.chunk_count(), 2);
    assert_eq!(reader.spikes().count(), 4);
}

#[test]
fn test_empty_recording() {
    let recording = MemoryRecording::builder().vars(vars()).build();
    let reader = EventStreamReader::new(&recording, ReaderConfig::default()).unwrap();
    assert_eq!(reader.wave_width(), 0);
    assert_eq!(reader.chunk_count(), 0);
    assert_eq!(reader.spikes().count(), 0);
}

// ==================== Corrupted Input Tests ====================

#[test]
fn test_non_integral_wave_width_fails_before_streaming() {
    let recording = MemoryRecording::builder()
        .vars(vars())
        .chunk_len(4)
        .times((0..10).collect())
        .channels(vec![0; 10])
        .units(vec![0; 10])
        .forms(vec![0; 37])
        .build();

    let result = EventStreamReader::new(&recording, ReaderConfig::default());
    assert!(matches!(result, Err(ReadError::CorruptedData(_))));
}

#[test]
fn test_mismatched_parallel_arrays() {
    let recording = MemoryRecording::builder()
        .vars(vars())
        .times((0..10).collect())
        .channels(vec![0; 9])
        .units(vec![0; 10])
        .forms(vec![0; 40])
        .build();

    let result = EventStreamReader::new(&recording, ReaderConfig::default());
    assert!(matches!(result, Err(ReadError::CorruptedData(_))));
}

#[test]
fn test_two_dimensional_waveforms_unsupported() {
    let recording = MemoryRecording::builder()
        .vars(vars())
        .times((0..10).collect())
        .channels(vec![0; 10])
        .units(vec![0; 10])
        .forms_array(MemoryArray::with_shape(vec![0; 40], vec![10, 4], 4))
        .build();

    let result = EventStreamReader::new(&recording, ReaderConfig::default());
    assert!(matches!(result, Err(ReadError::UnsupportedInput(_))));
}

// ==================== Chunk Selection Tests ====================

#[test]
fn test_select_preserves_relative_order() {
    let chunk = SpikeChunk::new(
        vec![0.1, 0.2, 0.3, 0.4, 0.5],
        vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 5.5],
        vec![1, 1, 2, 3, 2],
        vec![7, 8, 9, 10, 11],
        2,
    )
    .unwrap();

    assert_eq!(chunk.distinct_channels(), vec![1, 2, 3]);

    let channel_two = chunk.select(&chunk.channel_mask(2));
    assert_eq!(channel_two.times, vec![0.3, 0.5]);
    assert_eq!(channel_two.waveforms, vec![3.0, 3.5, 5.0, 5.5]);
    assert_eq!(channel_two.unit_ids, vec![9, 11]);
    assert_eq!(channel_two.wave_width(), 2);
}

#[test]
fn test_chunk_rejects_ragged_columns() {
    let result = SpikeChunk::new(vec![0.0; 3], vec![0.0; 5], vec![0; 3], vec![0; 3], 2);
    assert!(matches!(result, Err(ReadError::CorruptedData(_))));
}
