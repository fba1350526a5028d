use anyhow::{Context, Result};
use std::path::PathBuf;

use spikedemux::store::{read_manifest, summarize_channel};

/// Display information about a channel store directory
pub fn run(store: PathBuf) -> Result<()> {
    if !store.exists() {
        anyhow::bail!("Store does not exist: {}", store.display());
    }

    let manifest = read_manifest(&store).context("Failed to read store manifest")?;

    println!("Channel Store Information");
    println!("=========================");
    println!("Store: {}", store.display());
    println!("Format version: {}", manifest.format_version);
    println!("Created: {}", manifest.created);
    println!("Converter: {}", manifest.converter);
    if let Some(source) = &manifest.source {
        println!("Source: {}", source);
    }
    println!();

    println!("Layout:");
    println!("  Waveform width: {}", manifest.wave_width);
    println!("  Rows per chunk: {}", manifest.chunk_rows);
    println!("  Channels: {}", manifest.channels.len());
    println!(
        "  Total spikes: {}",
        manifest.channels.iter().map(|c| c.rows).sum::<usize>()
    );
    println!();

    println!("Channels:");
    for entry in &manifest.channels {
        let summary = summarize_channel(store.join(&entry.path))
            .with_context(|| format!("Failed to read {}", entry.path))?;
        let status = if summary.rows == entry.rows && summary.row_groups == entry.chunks {
            ""
        } else {
            "  (footer disagrees with manifest)"
        };
        println!(
            "  {:5}  {:8} spikes  {:5} row groups  {:5} parts  {}{}",
            summary.channel_id,
            summary.rows,
            summary.row_groups,
            summary.parts,
            entry.path,
            status
        );
    }

    Ok(())
}
