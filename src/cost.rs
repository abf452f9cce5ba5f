//! Outer join of the per-channel partial results into the final cost table.

use crate::channel::ChannelLabel;
use crate::overhead::OverheadTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Per-channel partial results produced upstream of the merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelAggregates {
    pub customers_acquired: BTreeMap<ChannelLabel, u64>,
    pub direct_spend: BTreeMap<ChannelLabel, f64>,
    pub indirect_cost: BTreeMap<ChannelLabel, f64>,
    pub converted_customers: BTreeMap<ChannelLabel, u64>,
}

/// One output row of the cost table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCostSummary {
    pub channel: ChannelLabel,
    pub customers_acquired: u64,
    pub total_direct_spend: f64,
    pub indirect_cost: f64,
    pub converted_customers: u64,
    pub staff_cost: f64,
    pub technology_cost: f64,
    pub returns_processing_cost: f64,
    pub true_total_cost: f64,
    pub true_cac: f64,
}

/// Cost per converted customer. With no conversions the full cost is reported.
pub fn true_cac(true_total_cost: f64, converted_customers: u64) -> f64 {
    if converted_customers == 0 {
        true_total_cost
    } else {
        true_total_cost / converted_customers as f64
    }
}

/// Full outer join of every partial table and the overhead table by channel.
///
/// Missing values are 0. Rows come out ordered by channel label.
pub fn merge_channel_costs(
    aggregates: &ChannelAggregates,
    overhead: &OverheadTable,
) -> Vec<ChannelCostSummary> {
    let channels: BTreeSet<&ChannelLabel> = aggregates
        .customers_acquired
        .keys()
        .chain(aggregates.direct_spend.keys())
        .chain(aggregates.indirect_cost.keys())
        .chain(aggregates.converted_customers.keys())
        .chain(overhead.channels())
        .collect();

    channels
        .into_iter()
        .map(|channel| {
            let fixed = overhead.get(channel).copied().unwrap_or_default();
            let total_direct_spend = aggregates.direct_spend.get(channel).copied().unwrap_or(0.0);
            let indirect_cost = aggregates.indirect_cost.get(channel).copied().unwrap_or(0.0);
            let converted_customers = aggregates
                .converted_customers
                .get(channel)
                .copied()
                .unwrap_or(0);

            let true_total_cost = total_direct_spend
                + indirect_cost
                + fixed.staff_cost
                + fixed.technology_cost
                + fixed.returns_processing_cost;

            ChannelCostSummary {
                channel: channel.clone(),
                customers_acquired: aggregates
                    .customers_acquired
                    .get(channel)
                    .copied()
                    .unwrap_or(0),
                total_direct_spend,
                indirect_cost,
                converted_customers,
                staff_cost: fixed.staff_cost,
                technology_cost: fixed.technology_cost,
                returns_processing_cost: fixed.returns_processing_cost,
                true_total_cost,
                true_cac: true_cac(true_total_cost, converted_customers),
            }
        })
        .collect()
}

/// Orderings offered for the cost table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Channel label ascending
    Channel,
    /// True CAC descending
    #[serde(alias = "cac")]
    TrueCac,
    /// True total cost descending
    #[serde(alias = "total")]
    TrueTotalCost,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "channel" => Ok(SortKey::Channel),
            "cac" | "true_cac" => Ok(SortKey::TrueCac),
            "total" | "true_total_cost" => Ok(SortKey::TrueTotalCost),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

/// Column sums over the whole cost table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostTotals {
    pub customers_acquired: u64,
    pub converted_customers: u64,
    pub total_direct_spend: f64,
    pub indirect_cost: f64,
    pub staff_cost: f64,
    pub technology_cost: f64,
    pub returns_processing_cost: f64,
    pub true_total_cost: f64,
    /// Total cost over total conversions, same zero-conversion policy as per channel
    pub blended_cac: f64,
}

/// The complete result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostReport {
    pub attribution_mode: String,
    pub total_indirect_pool: f64,
    pub computed_at: DateTime<Utc>,
    pub rows: Vec<ChannelCostSummary>,
}

impl CostReport {
    pub fn new(
        attribution_mode: impl Into<String>,
        total_indirect_pool: f64,
        rows: Vec<ChannelCostSummary>,
    ) -> Self {
        CostReport {
            attribution_mode: attribution_mode.into(),
            total_indirect_pool,
            computed_at: Utc::now(),
            rows,
        }
    }

    pub fn row(&self, channel: &str) -> Option<&ChannelCostSummary> {
        self.rows.iter().find(|row| row.channel.as_str() == channel)
    }

    /// Reorders the rows. Ties on cost are broken by channel label.
    pub fn sort_by(&mut self, key: SortKey) {
        match key {
            SortKey::Channel => self.rows.sort_by(|a, b| a.channel.cmp(&b.channel)),
            SortKey::TrueCac => self.rows.sort_by(|a, b| {
                b.true_cac
                    .total_cmp(&a.true_cac)
                    .then_with(|| a.channel.cmp(&b.channel))
            }),
            SortKey::TrueTotalCost => self.rows.sort_by(|a, b| {
                b.true_total_cost
                    .total_cmp(&a.true_total_cost)
                    .then_with(|| a.channel.cmp(&b.channel))
            }),
        }
    }

    pub fn totals(&self) -> CostTotals {
        let mut totals = self.rows.iter().fold(CostTotals::default(), |mut acc, row| {
            acc.customers_acquired += row.customers_acquired;
            acc.converted_customers += row.converted_customers;
            acc.total_direct_spend += row.total_direct_spend;
            acc.indirect_cost += row.indirect_cost;
            acc.staff_cost += row.staff_cost;
            acc.technology_cost += row.technology_cost;
            acc.returns_processing_cost += row.returns_processing_cost;
            acc.true_total_cost += row.true_total_cost;
            acc
        });
        totals.blended_cac = true_cac(totals.true_total_cost, totals.converted_customers);
        totals
    }
}
