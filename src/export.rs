//! # Text Export
//!
//! Streams the spikes of one channel group into plain-text files, two per
//! `(channel, unit)` pair:
//!
//! - `{label}_unit_{unit}.txt`: one spike time per line, in seconds
//! - `{label}_unit_{unit}_waves.txt`: one space-separated waveform per line, in volts
//!
//! Values are printed like C's `%.18e` (see [`format_sci`]). Files are opened
//! on the first spike of their pair and closed once at the end of the pass,
//! on success and on error alike.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::reader::{ChunkCursor, EventStreamReader, ReadError, ReaderConfig};
use crate::source::{ChannelGroup, EventSource, KeyKind, SourceError};

/// Errors that can occur during a text export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Error reading the source arrays
    #[error("Read error: {0}")]
    ReadError(#[from] ReadError),

    /// Missing group or channel label
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// I/O error writing an output file
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Format `value` in scientific notation with 18 fractional digits.
///
/// Matches C's `%.18e`: the exponent is signed and has at least two digits,
/// and non-finite values print as `nan`, `inf` and `-inf`.
pub fn format_sci(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let formatted = format!("{:.18e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => formatted,
    }
}

/// Opens output resources by path
pub trait ResourceFactory {
    /// Writer for one resource. Dropping it closes the resource.
    type Writer: Write;

    /// Create (or truncate) the resource at `path`
    fn open(&mut self, path: &Path) -> io::Result<Self::Writer>;
}

/// Buffered files on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsResources;

impl ResourceFactory for FsResources {
    type Writer = BufWriter<File>;

    fn open(&mut self, path: &Path) -> io::Result<BufWriter<File>> {
        Ok(BufWriter::new(File::create(path)?))
    }
}

struct PairResources<W> {
    times: W,
    waves: W,
}

/// Open resources keyed by `(channel, unit)`.
///
/// Dropping the table closes everything still open.
struct ResourceTable<W: Write> {
    open: BTreeMap<(u32, u32), PairResources<W>>,
}

impl<W: Write> ResourceTable<W> {
    fn new() -> Self {
        Self {
            open: BTreeMap::new(),
        }
    }

    /// Flush and close every resource, reporting the first flush failure
    fn close_all(&mut self) -> io::Result<()> {
        let mut result = Ok(());
        for (_, mut pair) in std::mem::take(&mut self.open) {
            for writer in [&mut pair.times, &mut pair.waves] {
                if let Err(e) = writer.flush() {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }
}

impl<W: Write> Drop for ResourceTable<W> {
    fn drop(&mut self) {
        if !self.open.is_empty() {
            warn!("Closing {} unfinished export resource pairs", self.open.len());
            self.open.clear();
        }
    }
}

/// Statistics from a text export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Spikes read from the source
    pub spikes_read: usize,
    /// Spikes belonging to the group, written out
    pub spikes_written: usize,
    /// Files opened
    pub resources_opened: usize,
}

impl fmt::Display for ExportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Exported {} of {} spikes into {} files",
            self.spikes_written, self.spikes_read, self.resources_opened
        )
    }
}

/// Exports the spikes of one channel group to text files
pub struct GroupExporter<'a, S: EventSource + ?Sized, F: ResourceFactory = FsResources> {
    source: &'a S,
    group: ChannelGroup,
    labels: Vec<String>,
    out_dir: PathBuf,
    reader_config: ReaderConfig,
    factory: F,
}

impl<'a, S: EventSource + ?Sized> GroupExporter<'a, S, FsResources> {
    /// Prepare an export of `group_name` into `out_dir`.
    ///
    /// Fails with a missing-key error if the group does not exist.
    pub fn new<P: AsRef<Path>>(
        source: &'a S,
        group_name: &str,
        out_dir: P,
    ) -> Result<Self, ExportError> {
        let group = source.channel_group(group_name)?;
        let labels = source.channel_labels()?;
        Ok(Self {
            source,
            group,
            labels,
            out_dir: out_dir.as_ref().to_path_buf(),
            reader_config: ReaderConfig::default(),
            factory: FsResources,
        })
    }
}

impl<'a, S: EventSource + ?Sized, F: ResourceFactory> GroupExporter<'a, S, F> {
    /// Open resources through `factory` instead
    pub fn with_resources<G: ResourceFactory>(self, factory: G) -> GroupExporter<'a, S, G> {
        GroupExporter {
            source: self.source,
            group: self.group,
            labels: self.labels,
            out_dir: self.out_dir,
            reader_config: self.reader_config,
            factory,
        }
    }

    /// Chunking used while streaming the source
    pub fn with_reader_config(mut self, config: ReaderConfig) -> Self {
        self.reader_config = config;
        self
    }

    /// The exported group
    pub fn group(&self) -> &ChannelGroup {
        &self.group
    }

    /// Paths of the time and waveform files of a `(channel, unit)` pair
    pub fn resource_paths(
        &self,
        channel_id: u32,
        unit_id: u32,
    ) -> Result<(PathBuf, PathBuf), ExportError> {
        let label = self
            .labels
            .get(channel_id as usize)
            .ok_or_else(|| SourceError::missing(KeyKind::Channel, channel_id))?;
        Ok((
            self.out_dir.join(format!("{}_unit_{}.txt", label, unit_id)),
            self.out_dir.join(format!("{}_unit_{}_waves.txt", label, unit_id)),
        ))
    }

    /// Check that every channel holding spikes of the group has a label.
    ///
    /// Scans the channel and unit arrays chunk by chunk, without decoding.
    pub fn check_labels(&self) -> Result<(), ExportError> {
        let chunk_size = self
            .source
            .spike_times()
            .chunk_len()
            .saturating_mul(self.reader_config.chunk_multiplier);
        let channels = ChunkCursor::new(self.source.spike_channels(), chunk_size)?;
        let units = ChunkCursor::new(self.source.spike_units(), chunk_size)?;
        let max_chunks = self.reader_config.max_chunks.unwrap_or(usize::MAX);

        for (channel_ids, unit_ids) in channels.zip(units).take(max_chunks) {
            let (channel_ids, unit_ids) = (channel_ids?, unit_ids?);
            for (&channel_id, &unit_id) in channel_ids.iter().zip(&unit_ids) {
                if self.group.contains_unit(unit_id) && channel_id as usize >= self.labels.len() {
                    return Err(SourceError::missing(KeyKind::Channel, channel_id).into());
                }
            }
        }
        Ok(())
    }

    /// Stream the source once, writing every spike of the group.
    ///
    /// Missing labels are reported before any file is created. Already
    /// written files are left in place if the pass fails later.
    pub fn export(&mut self) -> Result<ExportStats, ExportError> {
        let reader = EventStreamReader::new(self.source, self.reader_config)?;
        self.check_labels()?;
        fs::create_dir_all(&self.out_dir)?;
        info!(
            "Exporting group '{}' ({} units) to {}",
            self.group.name(),
            self.group.units().len(),
            self.out_dir.display()
        );

        let mut table = ResourceTable::new();
        let mut stats = ExportStats::default();
        for record in reader.spikes() {
            let record = record?;
            stats.spikes_read += 1;
            if !self.group.contains_unit(record.unit_id) {
                continue;
            }

            let pair = match table.open.entry((record.channel_id, record.unit_id)) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let (times_path, waves_path) =
                        self.resource_paths(record.channel_id, record.unit_id)?;
                    debug!("Opening {}", times_path.display());
                    let times = self.factory.open(&times_path)?;
                    let waves = self.factory.open(&waves_path)?;
                    stats.resources_opened += 2;
                    entry.insert(PairResources { times, waves })
                }
            };

            writeln!(pair.times, "{} ", format_sci(record.time))?;
            write_waveform(&mut pair.waves, &record.waveform)?;
            stats.spikes_written += 1;
        }

        table.close_all()?;
        info!("{}", stats);
        Ok(stats)
    }
}

fn write_waveform<W: Write>(out: &mut W, waveform: &[f64]) -> io::Result<()> {
    for (i, sample) in waveform.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ")?;
        }
        out.write_all(format_sci(*sample).as_bytes())?;
    }
    out.write_all(b"\n")
}
