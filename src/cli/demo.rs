use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use spikedemux::container::RecordingFile;
use spikedemux::demux::{DemuxConfig, DemuxEngine, LogProgress};
use spikedemux::export::GroupExporter;
use spikedemux::reader::ReaderConfig;
use spikedemux::source::{EventSource, SyntheticRecording};
use spikedemux::store::ParquetBackend;

use super::config::Config;
use super::Profile;

/// Options of the demo command after argument parsing
pub struct DemoOptions {
    pub output: PathBuf,
    pub spikes: usize,
    pub channels: u32,
    pub wave_width: usize,
    pub chunk_len: usize,
    pub profile: Profile,
    pub config: Option<PathBuf>,
    pub group: Option<String>,
    pub export: bool,
    pub max_chunks: Option<usize>,
    pub eager_channels: bool,
}

/// Generate a synthetic recording, demultiplex it and export one group
pub fn run(options: DemoOptions) -> Result<()> {
    info!("spikedemux - Synthetic Recording Demo");
    info!("=====================================");

    let file_config = match &options.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut reader_config = file_config.apply_reader(ReaderConfig::default());
    if let Some(max_chunks) = options.max_chunks {
        reader_config.max_chunks = Some(max_chunks);
    }
    let store_config = file_config.apply_store(options.profile.store_config());
    let eager_channels =
        options.eager_channels || file_config.demux.eager_channels.unwrap_or(false);
    let group = options
        .group
        .or_else(|| file_config.export.group.clone())
        .unwrap_or_else(|| SyntheticRecording::ALL_UNITS_GROUP.to_string());

    info!(
        "Generating {} spikes on {} channels (waveform width {})...",
        options.spikes, options.channels, options.wave_width
    );
    let recording = SyntheticRecording {
        n_spikes: options.spikes,
        n_channels: options.channels,
        wave_width: options.wave_width,
        chunk_len: options.chunk_len,
        ..Default::default()
    }
    .generate();

    let recording = RecordingFile::open(recording)
        .context("Failed to identify recording")?
        .into_results()
        .context("Recording holds no spike results")?;
    let vars = recording
        .recording_vars()
        .context("Failed to read recording variables")?;
    info!(
        "Recording: {:.2} s at {} Hz, {}-bit samples",
        vars.duration(),
        vars.sampling_rate,
        vars.bit_depth
    );

    let store_dir = options.output.join("store");
    info!("Creating channel store: {}", store_dir.display());
    let backend = ParquetBackend::create(&store_dir, store_config.clone())
        .context("Failed to create channel store")?
        .with_source_description(recording.description());

    let mut engine = DemuxEngine::new(DemuxConfig {
        reader: reader_config,
        store: store_config,
        eager_channels,
    });
    engine.on_progress(LogProgress::every(10));

    let result = engine
        .run(&recording, backend)
        .context("Demultiplexing failed")?;
    let (demux_stats, store_stats) = result
        .finish()
        .context("Failed to finalize channel store")?;

    info!("Demultiplexing complete!");
    info!("  {}", demux_stats);
    info!("  {}", store_stats);

    if options.export {
        let text_dir = options.output.join("text");
        let export_stats = GroupExporter::new(&recording, &group, &text_dir)
            .with_context(|| format!("Cannot export group '{}'", group))?
            .with_reader_config(reader_config)
            .export()
            .context("Text export failed")?;

        info!("Export complete!");
        info!("  Output directory: {}", text_dir.display());
        info!("  {}", export_stats);
    }

    Ok(())
}
