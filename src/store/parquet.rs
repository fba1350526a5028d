//! Parquet-backed channel stores
//!
//! Layout of a store directory:
//!
//! ```text
//! <root>/
//!   store.json                          manifest, written when the store finishes
//!   channels/channel_<id>/part-<n>.parquet
//! ```
//!
//! Each channel buffers rows in memory until it holds one storage chunk, then
//! writes that chunk as a self-contained part file (`SpikeTimes`, `WaveForms`,
//! one row group). A part file is opened and closed within a single flush, so
//! the number of open file handles does not grow with the channel count.
//! Parts are numbered in append order; reading them in that order yields the
//! spikes of the channel in the order they were appended.
//!
//! Every part on disk is complete and readable. A pass that fails before
//! [`ChannelStore::finish`](super::ChannelStore::finish) keeps the parts
//! already flushed and loses the rows still buffered, and no manifest is
//! written.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, FixedSizeListArray, Float64Array};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::metadata::ParquetMetaData;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde::{Deserialize, Serialize};

use super::columns::{self, CHANNEL_ID_KEY, SOURCE_KEY, WAVE_WIDTH_KEY};
use super::memory::MemoryChannel;
use super::{ChannelArrays, ChannelStats, StoreBackend, StoreConfig, StoreError, StoreLayout, StoreStats};

/// Name of the manifest file at the store root
pub const MANIFEST_FILE_NAME: &str = "store.json";

/// Version of the on-disk store layout
pub const STORE_FORMAT_VERSION: &str = "2.0";

const CHANNELS_DIR: &str = "channels";
const PART_PREFIX: &str = "part-";
const PART_SUFFIX: &str = ".parquet";

fn channel_dir_name(channel_id: u32) -> String {
    format!("{}/channel_{}", CHANNELS_DIR, channel_id)
}

fn part_file_name(index: usize) -> String {
    format!("{}{:05}{}", PART_PREFIX, index, PART_SUFFIX)
}

fn part_index(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(PART_PREFIX)?
        .strip_suffix(PART_SUFFIX)?
        .parse()
        .ok()
}

/// Backend writing one directory of Parquet part files per channel
#[derive(Debug)]
pub struct ParquetBackend {
    root: PathBuf,
    config: StoreConfig,
    source: Option<String>,
}

impl ParquetBackend {
    /// Create a new store directory at `root`, which must not exist yet
    pub fn create<P: AsRef<Path>>(root: P, config: StoreConfig) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        if root.exists() {
            return Err(StoreError::AlreadyExists(root.display().to_string()));
        }
        fs::create_dir_all(root.join(CHANNELS_DIR))?;
        info!("Created channel store at {}", root.display());

        Ok(Self {
            root,
            config,
            source: None,
        })
    }

    /// Record the description of the source recording in every file
    pub fn with_source_description(mut self, description: impl Into<String>) -> Self {
        self.source = Some(description.into());
        self
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the part files of `channel_id`
    pub fn channel_path(&self, channel_id: u32) -> PathBuf {
        self.root.join(channel_dir_name(channel_id))
    }

    fn build_manifest(&self, stats: &StoreStats) -> StoreManifest {
        StoreManifest {
            format_version: STORE_FORMAT_VERSION.to_string(),
            created: chrono::Utc::now().to_rfc3339(),
            converter: format!("spikedemux v{}", env!("CARGO_PKG_VERSION")),
            source: self.source.clone(),
            wave_width: stats.wave_width,
            chunk_rows: stats.chunk_rows,
            channels: stats
                .channels
                .iter()
                .map(|c| ManifestChannel {
                    channel_id: c.channel_id,
                    path: channel_dir_name(c.channel_id),
                    rows: c.rows,
                    chunks: c.chunks,
                })
                .collect(),
        }
    }
}

impl StoreBackend for ParquetBackend {
    type Arrays = ParquetChannel;

    fn create(&mut self, channel_id: u32, layout: &StoreLayout) -> Result<ParquetChannel, StoreError> {
        if layout.wave_width == 0 {
            return Err(StoreError::InvalidData(
                "waveforms must have at least one sample".to_string(),
            ));
        }

        let mut metadata = HashMap::new();
        metadata.insert(CHANNEL_ID_KEY.to_string(), channel_id.to_string());
        metadata.insert(WAVE_WIDTH_KEY.to_string(), layout.wave_width.to_string());
        if let Some(source) = &self.source {
            metadata.insert(SOURCE_KEY.to_string(), source.clone());
        }

        let dir = self.channel_path(channel_id);
        fs::create_dir_all(&dir)?;
        let chunk_rows = layout.chunk_rows.max(1);

        Ok(ParquetChannel {
            channel_id,
            dir,
            schema: columns::channel_schema(layout.wave_width),
            props: self.config.to_writer_properties(&metadata, chunk_rows),
            wave_width: layout.wave_width,
            chunk_rows,
            times: Vec::with_capacity(chunk_rows),
            waveforms: Vec::with_capacity(chunk_rows * layout.wave_width),
            rows: 0,
            parts: 0,
            chunks: 0,
        })
    }

    fn finalize(&mut self, stats: &StoreStats) -> Result<(), StoreError> {
        let manifest = self.build_manifest(stats);
        let file = File::create(self.root.join(MANIFEST_FILE_NAME))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &manifest)?;
        info!("{}", stats);
        Ok(())
    }
}

/// Buffered writer for one channel directory
pub struct ParquetChannel {
    channel_id: u32,
    dir: PathBuf,
    schema: Arc<Schema>,
    props: WriterProperties,
    wave_width: usize,
    chunk_rows: usize,
    times: Vec<f64>,
    waveforms: Vec<f64>,
    rows: usize,
    parts: usize,
    chunks: usize,
}

impl ParquetChannel {
    /// Channel id
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Rows appended but not yet written to a part file
    pub fn buffered(&self) -> usize {
        self.times.len()
    }

    /// Part files written so far
    pub fn parts(&self) -> usize {
        self.parts
    }

    /// Write the first `n` buffered rows as the next part file
    fn flush(&mut self, n: usize) -> Result<(), StoreError> {
        let times: Vec<f64> = self.times.drain(..n).collect();
        let waveforms: Vec<f64> = self.waveforms.drain(..n * self.wave_width).collect();

        let path = self.dir.join(part_file_name(self.parts));
        let mut writer = ArrowWriter::try_new(
            File::create(&path)?,
            self.schema.clone(),
            Some(self.props.clone()),
        )?;
        if !times.is_empty() {
            writer.write(&self.batch(times, waveforms)?)?;
            self.chunks += 1;
        }
        writer.close()?;
        self.parts += 1;
        Ok(())
    }

    fn batch(&self, times: Vec<f64>, waveforms: Vec<f64>) -> Result<RecordBatch, StoreError> {
        let waves = FixedSizeListArray::try_new(
            columns::wave_sample_field(),
            self.wave_width as i32,
            Arc::new(Float64Array::from(waveforms)),
            None,
        )?;
        let arrays: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(times)), Arc::new(waves)];
        Ok(RecordBatch::try_new(self.schema.clone(), arrays)?)
    }
}

impl ChannelArrays for ParquetChannel {
    fn append(&mut self, times: &[f64], waveforms: &[f64]) -> Result<(), StoreError> {
        self.times.extend_from_slice(times);
        self.waveforms.extend_from_slice(waveforms);
        self.rows += times.len();
        while self.times.len() >= self.chunk_rows {
            self.flush(self.chunk_rows)?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows
    }

    fn finish(mut self) -> Result<ChannelStats, StoreError> {
        // An empty channel still gets one part carrying its footer metadata
        if !self.times.is_empty() || self.parts == 0 {
            self.flush(self.times.len())?;
        }
        debug!(
            "Closed channel {} with {} rows in {} parts",
            self.channel_id, self.rows, self.parts
        );
        Ok(ChannelStats {
            channel_id: self.channel_id,
            rows: self.rows,
            chunks: self.chunks,
        })
    }
}

/// Manifest describing a finished store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    /// Store layout version
    pub format_version: String,
    /// Creation time (RFC 3339)
    pub created: String,
    /// Program that wrote the store
    pub converter: String,
    /// Description of the source recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Samples per waveform
    pub wave_width: usize,
    /// Rows per storage chunk
    pub chunk_rows: usize,
    /// Channel files in channel id order
    pub channels: Vec<ManifestChannel>,
}

/// One channel entry of a [`StoreManifest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestChannel {
    /// Channel id
    pub channel_id: u32,
    /// Channel directory relative to the store root
    pub path: String,
    /// Spikes stored
    pub rows: usize,
    /// Non-empty storage chunks
    pub chunks: usize,
}

/// Read the manifest of the store at `root`
pub fn read_manifest<P: AsRef<Path>>(root: P) -> Result<StoreManifest, StoreError> {
    let file = File::open(root.as_ref().join(MANIFEST_FILE_NAME))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Footer summary of one channel directory
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    /// Channel id
    pub channel_id: u32,
    /// Spikes stored
    pub rows: usize,
    /// Row groups across all parts
    pub row_groups: usize,
    /// Part files
    pub parts: usize,
    /// Samples per waveform
    pub wave_width: usize,
    /// Description of the source recording, if recorded
    pub source: Option<String>,
}

fn key_value(metadata: &ParquetMetaData, key: &str) -> Option<String> {
    metadata
        .file_metadata()
        .key_value_metadata()?
        .iter()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.clone())
}

fn parse_key<T: std::str::FromStr>(metadata: &ParquetMetaData, key: &str) -> Result<T, StoreError> {
    key_value(metadata, key)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| StoreError::InvalidData(format!("missing or invalid footer key {}", key)))
}

/// Part files of a channel directory, in append order
pub fn channel_parts<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, StoreError> {
    let dir = dir.as_ref();
    let mut parts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(part_index) {
            parts.push((index, entry.path()));
        }
    }
    if parts.is_empty() {
        return Err(StoreError::InvalidData(format!(
            "no part files in {}",
            dir.display()
        )));
    }
    parts.sort_by_key(|(index, _)| *index);
    Ok(parts.into_iter().map(|(_, path)| path).collect())
}

/// Summarize a channel directory from its part footers without reading any data
pub fn summarize_channel<P: AsRef<Path>>(dir: P) -> Result<ChannelSummary, StoreError> {
    let parts = channel_parts(dir)?;
    let mut summary: Option<ChannelSummary> = None;

    for path in &parts {
        let reader = SerializedFileReader::new(File::open(path)?)?;
        let metadata = reader.metadata();
        let rows = metadata.file_metadata().num_rows() as usize;
        let row_groups = metadata.num_row_groups();

        match summary.as_mut() {
            Some(summary) => {
                summary.rows += rows;
                summary.row_groups += row_groups;
            }
            None => {
                summary = Some(ChannelSummary {
                    channel_id: parse_key(metadata, CHANNEL_ID_KEY)?,
                    rows,
                    row_groups,
                    parts: parts.len(),
                    wave_width: parse_key(metadata, WAVE_WIDTH_KEY)?,
                    source: key_value(metadata, SOURCE_KEY),
                })
            }
        }
    }

    summary.ok_or_else(|| StoreError::InvalidData("channel has no parts".to_string()))
}

/// Read a whole channel directory back into memory
pub fn read_channel<P: AsRef<Path>>(dir: P) -> Result<MemoryChannel, StoreError> {
    let summary = summarize_channel(&dir)?;
    let mut times = Vec::with_capacity(summary.rows);
    let mut waveforms = Vec::with_capacity(summary.rows * summary.wave_width);
    let mut chunk_rows = 1;

    for path in channel_parts(&dir)? {
        let rows = read_part(&path, &mut times, &mut waveforms)?;
        chunk_rows = chunk_rows.max(rows);
    }

    Ok(MemoryChannel::from_parts(
        summary.channel_id,
        times,
        waveforms,
        summary.wave_width,
        chunk_rows,
    ))
}

/// Append the rows of one part file, returning its largest row group size
fn read_part(path: &Path, times: &mut Vec<f64>, waveforms: &mut Vec<f64>) -> Result<usize, StoreError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let largest_row_group = builder
        .metadata()
        .row_groups()
        .iter()
        .map(|rg| rg.num_rows() as usize)
        .max()
        .unwrap_or(0);

    for batch in builder.build()? {
        let batch = batch?;
        times.extend(float64_column(&batch, columns::SPIKE_TIMES)?.values().iter());

        let waves = batch
            .column_by_name(columns::WAVE_FORMS)
            .ok_or_else(|| StoreError::InvalidData(format!("missing column {}", columns::WAVE_FORMS)))?
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or_else(|| {
                StoreError::InvalidData(format!("{} is not a fixed-size list", columns::WAVE_FORMS))
            })?;
        if waves.value_type() != DataType::Float64 {
            return Err(StoreError::InvalidData(format!(
                "{} holds {} samples",
                columns::WAVE_FORMS,
                waves.value_type()
            )));
        }
        let samples = waves
            .values()
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| StoreError::InvalidData("waveform samples are not Float64".to_string()))?;
        waveforms.extend(samples.values().iter());
    }

    Ok(largest_row_group)
}

fn float64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, StoreError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::InvalidData(format!("missing column {}", name)))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| StoreError::InvalidData(format!("{} is not Float64", name)))
}
