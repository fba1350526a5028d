use std::collections::BTreeSet;

/// An electrode position on the array grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    /// Grid row
    pub row: u16,
    /// Grid column
    pub col: u16,
}

impl Channel {
    /// Create a channel at the given grid position
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// A named, user-defined set of channels and the units sorted from them.
///
/// Groups scope text exports: only spikes whose unit is a member are written.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    name: String,
    channels: Vec<Channel>,
    units: BTreeSet<u32>,
    color: Option<String>,
    visible: bool,
}

impl ChannelGroup {
    /// Create a visible group without a display color
    pub fn new(
        name: impl Into<String>,
        channels: Vec<Channel>,
        units: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self {
            name: name.into(),
            channels,
            units: units.into_iter().collect(),
            color: None,
            visible: true,
        }
    }

    /// Set the display color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the visibility flag
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channels belonging to the group
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Member unit ids, sorted
    pub fn units(&self) -> &BTreeSet<u32> {
        &self.units
    }

    /// Whether a unit is a member of this group
    pub fn contains_unit(&self, unit_id: u32) -> bool {
        self.units.contains(&unit_id)
    }

    /// Display color, if recorded
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Visibility flag
    pub fn visible(&self) -> bool {
        self.visible
    }
}
