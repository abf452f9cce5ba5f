//! Channel mapping from acquisition-channel space to touchpoint-channel space.

use crate::channel::ChannelLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps each acquisition channel to the touchpoint channels whose conversions
/// are attributed to it.
///
/// Each mapped set keeps insertion order and holds no duplicates. An
/// acquisition channel may map to several touchpoint channels and a
/// touchpoint channel may appear under several acquisition channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ChannelLabel, Vec<ChannelLabel>>",
    into = "BTreeMap<ChannelLabel, Vec<ChannelLabel>>"
)]
pub struct ChannelMapping {
    entries: BTreeMap<ChannelLabel, Vec<ChannelLabel>>,
}

impl ChannelMapping {
    pub fn new() -> Self {
        ChannelMapping {
            entries: BTreeMap::new(),
        }
    }

    /// Builds the degenerate mapping where every channel maps only to itself.
    pub fn identity(channels: impl IntoIterator<Item = ChannelLabel>) -> Self {
        let mut mapping = ChannelMapping::new();
        for channel in channels {
            mapping.insert(channel.clone(), vec![channel]);
        }
        mapping
    }

    /// Sets the touchpoint channels for an acquisition channel, replacing any
    /// previous set. Repeated labels are kept once, at their first position.
    pub fn insert(
        &mut self,
        acquisition_channel: ChannelLabel,
        touchpoint_channels: impl IntoIterator<Item = ChannelLabel>,
    ) {
        let mut set: Vec<ChannelLabel> = Vec::new();
        for channel in touchpoint_channels {
            if !set.contains(&channel) {
                set.push(channel);
            }
        }
        self.entries.insert(acquisition_channel, set);
    }

    /// Touchpoint channels attributed to `acquisition_channel`.
    ///
    /// Unmapped channels resolve to an empty set.
    pub fn touchpoint_channels(&self, acquisition_channel: &ChannelLabel) -> &[ChannelLabel] {
        self.entries
            .get(acquisition_channel)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterates acquisition channels with their mapped sets, ordered by label.
    pub fn iter(&self) -> impl Iterator<Item = (&ChannelLabel, &[ChannelLabel])> {
        self.entries
            .iter()
            .map(|(channel, mapped)| (channel, mapped.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<ChannelLabel, Vec<ChannelLabel>>> for ChannelMapping {
    fn from(raw: BTreeMap<ChannelLabel, Vec<ChannelLabel>>) -> Self {
        let mut mapping = ChannelMapping::new();
        for (acquisition_channel, touchpoint_channels) in raw {
            mapping.insert(acquisition_channel, touchpoint_channels);
        }
        mapping
    }
}

impl From<ChannelMapping> for BTreeMap<ChannelLabel, Vec<ChannelLabel>> {
    fn from(mapping: ChannelMapping) -> Self {
        mapping.entries
    }
}

/// How converted customers are attributed to acquisition channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AttributionMode {
    /// Acquisition and touchpoint channels share one vocabulary; converted
    /// customers are grouped on the touchpoint channel directly.
    Simple,
    /// Converted customers are credited to their acquisition channel when they
    /// converted on any of its mapped touchpoint channels.
    Mapped { mapping: ChannelMapping },
}

impl AttributionMode {
    pub fn name(&self) -> &'static str {
        match self {
            AttributionMode::Simple => "simple",
            AttributionMode::Mapped { .. } => "mapped",
        }
    }
}
