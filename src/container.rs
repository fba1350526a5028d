//! # Container Kinds
//!
//! Recording containers come in two flavours that share one storage format:
//! raw-signal files (`BRW`) and analysis-result files (`BXR`) which carry the
//! spike event arrays. The kind is decided once, when the file is opened, by
//! probing its description attribute.

use crate::source::{EventSource, SourceError};

/// Description prefix of raw-signal files
pub const BRW_DESCRIPTION_PREFIX: &str = "BRW-File Level3";

/// Description prefix of analysis-result files
pub const BXR_DESCRIPTION_PREFIX: &str = "BXR-File Level2";

/// Recognised container kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Raw signal recording
    Brw,
    /// Analysis results with spike events
    Bxr,
}

impl ContainerKind {
    /// Identify a container from its description attribute
    pub fn probe(description: &str) -> Result<Self, SourceError> {
        let description = description.trim_start();
        if description.starts_with(BRW_DESCRIPTION_PREFIX) {
            Ok(ContainerKind::Brw)
        } else if description.starts_with(BXR_DESCRIPTION_PREFIX) {
            Ok(ContainerKind::Bxr)
        } else {
            Err(SourceError::UnknownContainer(description.to_string()))
        }
    }

    /// Description prefix identifying this kind
    pub fn description_prefix(&self) -> &'static str {
        match self {
            ContainerKind::Brw => BRW_DESCRIPTION_PREFIX,
            ContainerKind::Bxr => BXR_DESCRIPTION_PREFIX,
        }
    }
}

/// An opened container, typed by what it holds.
#[derive(Debug)]
pub enum RecordingFile<S> {
    /// Raw signal recording
    Raw(S),
    /// Analysis results with spike events
    Results(S),
}

impl<S: EventSource> RecordingFile<S> {
    /// Probe the handle's description and wrap it in the matching variant
    pub fn open(source: S) -> Result<Self, SourceError> {
        match ContainerKind::probe(source.description())? {
            ContainerKind::Brw => Ok(RecordingFile::Raw(source)),
            ContainerKind::Bxr => Ok(RecordingFile::Results(source)),
        }
    }

    /// Kind of the opened file
    pub fn kind(&self) -> ContainerKind {
        match self {
            RecordingFile::Raw(_) => ContainerKind::Brw,
            RecordingFile::Results(_) => ContainerKind::Bxr,
        }
    }

    /// The event source of a results file
    pub fn into_results(self) -> Result<S, SourceError> {
        match self {
            RecordingFile::Results(source) => Ok(source),
            RecordingFile::Raw(source) => Err(SourceError::UnsupportedContainer(format!(
                "expected a {} file, found '{}'",
                BXR_DESCRIPTION_PREFIX,
                source.description()
            ))),
        }
    }
}
