use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod config;
mod demo;
mod info;
mod profile;

pub use profile::Profile;

/// spikedemux - spike event demultiplexer for multi-electrode recordings
#[derive(Parser)]
#[command(name = "spikedemux")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Storage profile for optimizing speed vs file size.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ProfileArg {
    /// Prioritize speed over file size
    Fast,
    /// Balance between speed and file size
    #[default]
    Balanced,
    /// Smallest files, slower writes
    MaxCompression,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Fast => Profile::Fast,
            ProfileArg::Balanced => Profile::Balanced,
            ProfileArg::MaxCompression => Profile::MaxCompression,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic recording, demultiplex it and export a group to text
    Demo {
        /// Output directory (must not exist)
        #[arg(value_name = "OUTPUT", default_value = "spikedemux_demo")]
        output: PathBuf,

        /// Number of spikes to generate
        #[arg(short = 'n', long, default_value = "100000")]
        spikes: usize,

        /// Number of recording channels
        #[arg(long, default_value = "64")]
        channels: u32,

        /// Samples per waveform
        #[arg(long, default_value = "32")]
        wave_width: usize,

        /// Native chunk length of the synthetic arrays
        #[arg(long, default_value = "1024")]
        chunk_len: usize,

        /// Storage profile (fast, balanced, max-compression)
        #[arg(short = 'p', long, default_value = "balanced", value_enum)]
        profile: ProfileArg,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Channel group to export as text
        #[arg(short = 'g', long)]
        group: Option<String>,

        /// Skip the text export
        #[arg(long)]
        no_export: bool,

        // === Advanced tuning flags (hidden from --help) ===
        /// Stop after this many chunks
        #[arg(long, hide = true)]
        max_chunks: Option<usize>,

        /// Create stores for every labelled channel up front
        #[arg(long, hide = true)]
        eager_channels: bool,
    },

    /// Display information about a channel store directory
    Info {
        /// Store directory
        #[arg(value_name = "STORE")]
        store: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Demo {
            output,
            spikes,
            channels,
            wave_width,
            chunk_len,
            profile,
            config,
            group,
            no_export,
            max_chunks,
            eager_channels,
        } => demo::run(demo::DemoOptions {
            output,
            spikes,
            channels,
            wave_width,
            chunk_len,
            profile: Profile::from(profile),
            config,
            group,
            export: !no_export,
            max_chunks,
            eager_channels,
        }),
        Commands::Info { store } => info::run(store),
    }
}
