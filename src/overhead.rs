use crate::channel::ChannelLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed per-channel costs that do not scale with volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverheadEntry {
    pub staff_cost: f64,
    pub technology_cost: f64,
    pub returns_processing_cost: f64,
}

impl OverheadEntry {
    pub fn new(staff_cost: f64, technology_cost: f64, returns_processing_cost: f64) -> Self {
        OverheadEntry {
            staff_cost,
            technology_cost,
            returns_processing_cost,
        }
    }

    fn is_valid(&self) -> bool {
        [
            self.staff_cost,
            self.technology_cost,
            self.returns_processing_cost,
        ]
        .iter()
        .all(|cost| cost.is_finite() && *cost >= 0.0)
    }
}

/// Static overhead figures keyed by channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverheadTable {
    entries: BTreeMap<ChannelLabel, OverheadEntry>,
}

impl OverheadTable {
    pub fn new() -> Self {
        OverheadTable {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, channel: ChannelLabel, entry: OverheadEntry) {
        self.entries.insert(channel, entry);
    }

    pub fn get(&self, channel: &ChannelLabel) -> Option<&OverheadEntry> {
        self.entries.get(channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelLabel> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the first channel whose figures are negative or not finite.
    pub fn find_invalid(&self) -> Option<&ChannelLabel> {
        self.entries
            .iter()
            .find(|(_, entry)| !entry.is_valid())
            .map(|(channel, _)| channel)
    }
}

impl FromIterator<(ChannelLabel, OverheadEntry)> for OverheadTable {
    fn from_iter<I: IntoIterator<Item = (ChannelLabel, OverheadEntry)>>(iter: I) -> Self {
        OverheadTable {
            entries: iter.into_iter().collect(),
        }
    }
}
