//! Per-channel aggregations over deduplicated record sets.

use crate::channel::ChannelLabel;
use crate::mapping::{AttributionMode, ChannelMapping};
use crate::records::{CustomerRecord, RecordId, SpendRecord, TouchpointRecord};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Number of customers acquired per acquisition channel.
pub fn customers_per_channel(customers: &[CustomerRecord]) -> BTreeMap<ChannelLabel, u64> {
    let mut counts = BTreeMap::new();
    for customer in customers {
        *counts
            .entry(customer.acquisition_channel.clone())
            .or_insert(0u64) += 1;
    }
    counts
}

/// Total direct spend per channel. Channels without spend rows are absent.
pub fn spend_per_channel(spend: &[SpendRecord]) -> BTreeMap<ChannelLabel, f64> {
    let mut totals = BTreeMap::new();
    for record in spend {
        *totals.entry(record.channel.clone()).or_insert(0.0) += record.spend_amount;
    }
    totals
}

/// Number of converted touchpoints per touchpoint channel.
///
/// This is always computed in touchpoint-channel space, whatever the
/// attribution mode.
pub fn converted_sessions_per_channel(
    touchpoints: &[TouchpointRecord],
) -> BTreeMap<ChannelLabel, u64> {
    let mut counts = BTreeMap::new();
    for touchpoint in touchpoints.iter().filter(|t| t.converted_flag) {
        *counts.entry(touchpoint.channel.clone()).or_insert(0u64) += 1;
    }
    counts
}

/// Distinct converted customers per channel under the given attribution mode.
pub fn converted_customers_per_channel(
    customers: &[CustomerRecord],
    touchpoints: &[TouchpointRecord],
    attribution: &AttributionMode,
) -> BTreeMap<ChannelLabel, u64> {
    match attribution {
        AttributionMode::Simple => converted_customers_by_touchpoint_channel(touchpoints),
        AttributionMode::Mapped { mapping } => {
            converted_customers_by_mapping(customers, touchpoints, mapping)
        }
    }
}

fn converted_customers_by_touchpoint_channel(
    touchpoints: &[TouchpointRecord],
) -> BTreeMap<ChannelLabel, u64> {
    let mut distinct: BTreeMap<&ChannelLabel, HashSet<&RecordId>> = BTreeMap::new();
    for touchpoint in touchpoints.iter().filter(|t| t.converted_flag) {
        distinct
            .entry(&touchpoint.channel)
            .or_default()
            .insert(&touchpoint.customer_id);
    }

    distinct
        .into_iter()
        .map(|(channel, ids)| (channel.clone(), ids.len() as u64))
        .collect()
}

fn converted_customers_by_mapping(
    customers: &[CustomerRecord],
    touchpoints: &[TouchpointRecord],
    mapping: &ChannelMapping,
) -> BTreeMap<ChannelLabel, u64> {
    let mut acquired: HashMap<&ChannelLabel, Vec<&RecordId>> = HashMap::new();
    for customer in customers {
        acquired
            .entry(&customer.acquisition_channel)
            .or_default()
            .push(&customer.customer_id);
    }

    // Channels each customer converted on.
    let mut converted_on: HashMap<&RecordId, HashSet<&ChannelLabel>> = HashMap::new();
    for touchpoint in touchpoints.iter().filter(|t| t.converted_flag) {
        converted_on
            .entry(&touchpoint.customer_id)
            .or_default()
            .insert(&touchpoint.channel);
    }

    let mut result = BTreeMap::new();
    for (channel, mapped) in mapping.iter() {
        let ids = match acquired.get(channel) {
            Some(ids) if !ids.is_empty() => ids,
            _ => {
                result.insert(channel.clone(), 0);
                continue;
            }
        };

        if mapped.is_empty() {
            debug!(channel = %channel, "no touchpoint channels mapped, converted customers is 0");
        }

        let distinct: HashSet<&RecordId> = ids
            .iter()
            .copied()
            .filter(|id| {
                converted_on
                    .get(id)
                    .map(|channels| mapped.iter().any(|m| channels.contains(m)))
                    .unwrap_or(false)
            })
            .collect();

        result.insert(channel.clone(), distinct.len() as u64);
    }

    result
}
