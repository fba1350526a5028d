//! # spikedemux
//!
//! A command-line tool for regrouping spike events of multi-electrode
//! recordings by channel.
//!
//! ## Usage
//!
//! ```bash
//! # Generate a synthetic recording, demultiplex it and export "Group 1"
//! spikedemux demo demo_output
//!
//! # Inspect the resulting channel store
//! spikedemux info demo_output/store
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::{dispatch, init_logging, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());
    dispatch(cli)
}
