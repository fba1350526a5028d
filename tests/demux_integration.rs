//! Integration tests for demultiplexing into Parquet channel stores
//!
//! These tests verify:
//! 1. Every spike lands in the store of its channel, in read order
//! 2. Channel parts carry the expected row groups and footer metadata
//! 3. The manifest agrees with the channel files
//! 4. Eager channel creation and truncated passes

use std::collections::BTreeMap;

use spikedemux::container::RecordingFile;
use spikedemux::decode::{TimeDecoder, WaveformDecoder};
use spikedemux::demux::{DemuxConfig, DemuxEngine};
use spikedemux::reader::{EventStreamReader, ReaderConfig, SpikeRecord};
use spikedemux::source::{EventSource, MemoryRecording, RawArray, SyntheticRecording};
use spikedemux::store::{
    read_channel, read_manifest, summarize_channel, ParquetBackend, StoreConfig, StoreError,
};
use tempfile::tempdir;

fn synthetic(n_spikes: usize, n_channels: u32, chunk_len: usize) -> MemoryRecording {
    SyntheticRecording {
        n_spikes,
        n_channels,
        wave_width: 8,
        chunk_len,
        ..Default::default()
    }
    .generate()
}

/// Expected per-channel records, by reading the source directly
fn records_by_channel(recording: &MemoryRecording) -> BTreeMap<u32, Vec<SpikeRecord>> {
    let mut grouped: BTreeMap<u32, Vec<SpikeRecord>> = BTreeMap::new();
    for record in EventStreamReader::new(recording, ReaderConfig::default())
        .unwrap()
        .spikes()
    {
        let record = record.unwrap();
        grouped.entry(record.channel_id).or_default().push(record);
    }
    grouped
}

#[test]
fn test_demux_to_parquet_round_trip() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let recording = synthetic(2_000, 12, 256);

    let backend = ParquetBackend::create(&root, StoreConfig::default())
        .unwrap()
        .with_source_description(recording.description());
    let result = DemuxEngine::new(DemuxConfig::default())
        .run(&recording, backend)
        .unwrap();
    assert_eq!(result.stats.chunks, 8);
    assert_eq!(result.stats.spikes_written, 2_000);
    assert_eq!(result.stats.channels_touched, 12);

    let (_, store_stats) = result.finish().unwrap();
    assert_eq!(store_stats.total_rows(), 2_000);
    // 256 >> 4
    assert_eq!(store_stats.chunk_rows, 16);

    let expected = records_by_channel(&recording);
    assert_eq!(expected.len(), 12);
    for (channel_id, records) in &expected {
        let path = root.join(format!("channels/channel_{}", channel_id));
        let channel = read_channel(&path).unwrap();
        assert_eq!(channel.channel_id(), *channel_id);
        assert_eq!(channel.wave_width(), 8);
        assert_eq!(channel.times().len(), records.len());

        for (row, record) in records.iter().enumerate() {
            assert_eq!(channel.times()[row], record.time);
            assert_eq!(channel.waveform(row), record.waveform.as_slice());
        }

        let summary = summarize_channel(&path).unwrap();
        assert_eq!(summary.row_groups, records.len().div_ceil(16));
        assert_eq!(summary.parts, records.len().div_ceil(16));
        assert_eq!(summary.source.as_deref(), Some(recording.description()));
    }
}

#[test]
fn test_manifest_matches_files() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let recording = synthetic(500, 5, 64);

    let backend = ParquetBackend::create(&root, StoreConfig::fast_write()).unwrap();
    DemuxEngine::new(DemuxConfig::default())
        .run(&recording, backend)
        .unwrap()
        .finish()
        .unwrap();

    let manifest = read_manifest(&root).unwrap();
    assert_eq!(manifest.wave_width, 8);
    assert_eq!(manifest.chunk_rows, 4);
    assert_eq!(manifest.channels.len(), 5);
    assert_eq!(manifest.channels.iter().map(|c| c.rows).sum::<usize>(), 500);

    for entry in &manifest.channels {
        let summary = summarize_channel(root.join(&entry.path)).unwrap();
        assert_eq!(summary.channel_id, entry.channel_id);
        assert_eq!(summary.rows, entry.rows);
        assert_eq!(summary.row_groups, entry.chunks);
    }
}

#[test]
fn test_decoded_values_reach_the_store() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let recording = synthetic(64, 2, 16);
    let vars = recording.recording_vars().unwrap();

    let backend = ParquetBackend::create(&root, StoreConfig::default()).unwrap();
    DemuxEngine::new(DemuxConfig::default())
        .run(&recording, backend)
        .unwrap()
        .finish()
        .unwrap();

    // Spike 0 is on channel 0 at frame 0
    let channel = read_channel(root.join("channels/channel_0")).unwrap();
    let raw_forms = recording.spike_forms().read(0..8).unwrap();
    assert_eq!(channel.times()[0], TimeDecoder::from(&vars).decode_one(0));
    let waves = WaveformDecoder::from(&vars);
    let expected: Vec<f64> = raw_forms.iter().map(|&raw| waves.decode_one(raw)).collect();
    assert_eq!(channel.waveform(0), expected.as_slice());
}

#[test]
fn test_eager_channels_writes_empty_files() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let recording = MemoryRecording::builder()
        .times(vec![0, 10, 20])
        .channels(vec![1, 1, 1])
        .units(vec![0, 0, 0])
        .forms(vec![2048; 6])
        .labels(vec!["a".into(), "b".into(), "c".into()])
        .build();

    let config = DemuxConfig {
        eager_channels: true,
        ..Default::default()
    };
    let backend = ParquetBackend::create(&root, StoreConfig::default()).unwrap();
    let (_, stats) = DemuxEngine::new(config)
        .run(&recording, backend)
        .unwrap()
        .finish()
        .unwrap();

    assert_eq!(stats.channels.len(), 3);
    for id in 0..3 {
        assert!(root.join(format!("channels/channel_{}", id)).is_dir());
    }
    assert_eq!(summarize_channel(root.join("channels/channel_0")).unwrap().rows, 0);
    assert_eq!(summarize_channel(root.join("channels/channel_1")).unwrap().rows, 3);
}

#[test]
fn test_truncated_pass() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let recording = synthetic(1_000, 4, 100);

    let config = DemuxConfig {
        reader: ReaderConfig::default().with_max_chunks(3),
        ..Default::default()
    };
    let backend = ParquetBackend::create(&root, StoreConfig::default()).unwrap();
    let (demux_stats, store_stats) = DemuxEngine::new(config)
        .run(&recording, backend)
        .unwrap()
        .finish()
        .unwrap();

    assert_eq!(demux_stats.chunks, 3);
    assert_eq!(store_stats.total_rows(), 300);
}

#[test]
fn test_container_must_hold_results() {
    let raw = MemoryRecording::builder()
        .description("BRW-File Level3 - raw signal")
        .build();
    assert!(RecordingFile::open(raw).unwrap().into_results().is_err());

    let results = synthetic(10, 2, 4);
    assert!(RecordingFile::open(results).unwrap().into_results().is_ok());
}

#[test]
fn test_existing_store_is_not_overwritten() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("store")).unwrap();
    let result = ParquetBackend::create(dir.path().join("store"), StoreConfig::default());
    assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
}
