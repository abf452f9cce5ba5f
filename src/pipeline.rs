//! The reconciliation pipeline: load, deduplicate, aggregate, allocate, merge.

use crate::aggregate::{
    converted_customers_per_channel, converted_sessions_per_channel, customers_per_channel,
    spend_per_channel,
};
use crate::allocation::allocate_indirect_cost;
use crate::channel::ChannelLabel;
use crate::config::{ExtraSources, PipelineConfig};
use crate::cost::{merge_channel_costs, ChannelAggregates, ChannelCostSummary, CostReport};
use crate::dedup::{dedup_first, union_dedup, UniqueKey};
use crate::error::PipelineError;
use crate::mapping::{AttributionMode, ChannelMapping};
use crate::records::{decode_rows, CustomerRecord, SpendRecord, TouchpointRecord};
use crate::source::{RecordSource, SourceName};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Deduplicated record sets ready for aggregation.
///
/// Construction always deduplicates, so every aggregation downstream sees
/// unique `customer_id`, `spend_id` and `touchpoint_id` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineInputs {
    customers: Vec<CustomerRecord>,
    spend: Vec<SpendRecord>,
    touchpoints: Vec<TouchpointRecord>,
}

impl PipelineInputs {
    pub fn new(
        customers: Vec<CustomerRecord>,
        spend: Vec<SpendRecord>,
        touchpoints: Vec<TouchpointRecord>,
    ) -> Self {
        PipelineInputs {
            customers: dedup_first(customers),
            spend: dedup_first(spend),
            touchpoints: dedup_first(touchpoints),
        }
    }

    pub fn customers(&self) -> &[CustomerRecord] {
        &self.customers
    }

    pub fn spend(&self) -> &[SpendRecord] {
        &self.spend
    }

    pub fn touchpoints(&self) -> &[TouchpointRecord] {
        &self.touchpoints
    }
}

fn fetch_records<T, S>(source: &S, name: SourceName) -> Result<Vec<T>, PipelineError>
where
    T: DeserializeOwned,
    S: RecordSource + ?Sized,
{
    let rows = source.fetch(name)?;
    debug!(source = %name, rows = rows.len(), "fetched source");
    decode_rows(name, rows)
}

fn fetch_with_extra<T, S>(
    source: &S,
    base: SourceName,
    extra: SourceName,
    include_extra: bool,
) -> Result<Vec<T>, PipelineError>
where
    T: DeserializeOwned + UniqueKey,
    S: RecordSource + ?Sized,
{
    let base_records = fetch_records(source, base)?;
    let extra_records = if include_extra {
        fetch_records(source, extra)?
    } else {
        Vec::new()
    };
    Ok(union_dedup(base_records, extra_records))
}

/// Pulls every configured source and decodes it.
///
/// Any retrieval or decoding failure aborts the load.
pub fn load_inputs<S: RecordSource + ?Sized>(
    source: &S,
    extra: &ExtraSources,
) -> Result<PipelineInputs, PipelineError> {
    let customers = fetch_with_extra(
        source,
        SourceName::Customers,
        SourceName::CustomersExtra,
        extra.customers,
    )?;
    let spend = fetch_with_extra(source, SourceName::Spend, SourceName::SpendExtra, extra.spend)?;
    let touchpoints = fetch_with_extra(
        source,
        SourceName::Touchpoints,
        SourceName::TouchpointsExtra,
        extra.touchpoints,
    )?;

    Ok(PipelineInputs::new(customers, spend, touchpoints))
}

/// Computes the per-channel cost table from deduplicated inputs.
///
/// Pure function of its arguments. The channel, spend and conversion
/// aggregations run in parallel; the merge waits for all of them.
pub fn compute_channel_costs(
    inputs: &PipelineInputs,
    config: &PipelineConfig,
) -> Vec<ChannelCostSummary> {
    let (customers_acquired, (direct_spend, (sessions, converted_customers))) = rayon::join(
        || customers_per_channel(&inputs.customers),
        || {
            rayon::join(
                || spend_per_channel(&inputs.spend),
                || {
                    (
                        converted_sessions_per_channel(&inputs.touchpoints),
                        converted_customers_per_channel(
                            &inputs.customers,
                            &inputs.touchpoints,
                            &config.attribution,
                        ),
                    )
                },
            )
        },
    );

    let indirect_cost = allocate_indirect_cost(&sessions, config.total_indirect_pool);

    if let AttributionMode::Mapped { mapping } = &config.attribution {
        warn_unallocated_mapped_channels(mapping, &sessions, &indirect_cost);
    }

    let aggregates = ChannelAggregates {
        customers_acquired,
        direct_spend,
        indirect_cost,
        converted_customers,
    };

    merge_channel_costs(&aggregates, &config.overhead)
}

// Indirect cost is joined by exact label, so an acquisition channel without a
// same-named touchpoint channel gets none of its mapped channels' share.
fn warn_unallocated_mapped_channels(
    mapping: &ChannelMapping,
    sessions: &BTreeMap<ChannelLabel, u64>,
    indirect_cost: &BTreeMap<ChannelLabel, f64>,
) {
    for (channel, mapped) in mapping.iter() {
        if indirect_cost.contains_key(channel) {
            continue;
        }

        let mapped_sessions: u64 = mapped.iter().filter_map(|m| sessions.get(m)).sum();
        if mapped_sessions > 0 {
            warn!(
                channel = %channel,
                mapped_sessions,
                "mapped touchpoint channels have converted sessions but the acquisition channel receives no indirect cost"
            );
        }
    }
}

/// Runs the whole pipeline against a record source.
///
/// Returns the cost table, or the first error encountered. No partial table
/// is ever returned.
pub fn run_pipeline<S: RecordSource + ?Sized>(
    source: &S,
    config: &PipelineConfig,
) -> Result<CostReport, PipelineError> {
    info!(
        mode = config.attribution.name(),
        pool = config.total_indirect_pool,
        "starting acquisition cost run"
    );

    let inputs = load_inputs(source, &config.extra_sources)?;
    info!(
        customers = inputs.customers.len(),
        spend = inputs.spend.len(),
        touchpoints = inputs.touchpoints.len(),
        "loaded deduplicated inputs"
    );

    let rows = compute_channel_costs(&inputs, config);
    info!(channels = rows.len(), "acquisition cost run complete");

    Ok(CostReport::new(
        config.attribution.name(),
        config.total_indirect_pool,
        rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overhead::{OverheadEntry, OverheadTable};
    use crate::source::InMemoryRecordSource;

    fn label(name: &str) -> ChannelLabel {
        ChannelLabel::new(name).unwrap()
    }

    fn simple_config() -> PipelineConfig {
        let mut overhead = OverheadTable::new();
        overhead.insert(label("Email"), OverheadEntry::new(50.0, 60.0, 30.0));
        overhead.insert(label("Google"), OverheadEntry::new(40.0, 50.0, 20.0));
        PipelineConfig::new(AttributionMode::Simple, overhead)
    }

    #[test]
    fn test_inputs_are_deduplicated_on_construction() {
        let inputs = PipelineInputs::new(
            vec![
                CustomerRecord::new(1, label("Email")),
                CustomerRecord::new(1, label("Google")),
            ],
            vec![
                SpendRecord::new("s1", label("Email"), 10.0),
                SpendRecord::new("s1", label("Email"), 10.0),
            ],
            Vec::new(),
        );

        assert_eq!(inputs.customers().len(), 1);
        assert_eq!(inputs.customers()[0].acquisition_channel, label("Email"));
        assert_eq!(inputs.spend().len(), 1);
    }

    #[test]
    fn test_duplicate_spend_counted_once() {
        let inputs = PipelineInputs::new(
            vec![CustomerRecord::new(1, label("Email"))],
            vec![
                SpendRecord::new("s1", label("Email"), 100.0),
                SpendRecord::new("s1", label("Email"), 100.0),
            ],
            Vec::new(),
        );

        let rows = compute_channel_costs(&inputs, &simple_config());
        let email = rows.iter().find(|r| r.channel == label("Email")).unwrap();
        assert_eq!(email.total_direct_spend, 100.0);
    }

    #[test]
    fn test_no_conversions_means_no_indirect_cost() {
        let inputs = PipelineInputs::new(
            vec![CustomerRecord::new(1, label("Email"))],
            Vec::new(),
            vec![TouchpointRecord::new(1, 1, label("Email"), false)],
        );

        let rows = compute_channel_costs(&inputs, &simple_config());
        assert!(rows.iter().all(|r| r.indirect_cost == 0.0));
        let email = rows.iter().find(|r| r.channel == label("Email")).unwrap();
        assert_eq!(email.true_cac, email.true_total_cost);
    }

    #[test]
    fn test_extra_sources_only_fetched_when_enabled() {
        let mut source = InMemoryRecordSource::new();
        source
            .add_records(SourceName::Customers, &[CustomerRecord::new(1, label("Email"))])
            .unwrap();
        source
            .add_records::<SpendRecord>(SourceName::Spend, &[])
            .unwrap();
        source
            .add_records::<TouchpointRecord>(SourceName::Touchpoints, &[])
            .unwrap();

        let inputs = load_inputs(&source, &ExtraSources::default()).unwrap();
        assert_eq!(inputs.customers().len(), 1);

        let with_extra = ExtraSources {
            customers: true,
            ..ExtraSources::default()
        };
        let result = load_inputs(&source, &with_extra);
        assert!(matches!(
            result,
            Err(PipelineError::SourceRetrieval {
                source: SourceName::CustomersExtra,
                ..
            })
        ));

        source
            .add_records(
                SourceName::CustomersExtra,
                &[
                    CustomerRecord::new(1, label("Google")),
                    CustomerRecord::new(2, label("Google")),
                ],
            )
            .unwrap();
        let inputs = load_inputs(&source, &with_extra).unwrap();
        assert_eq!(inputs.customers().len(), 2);
        assert_eq!(inputs.customers()[0].acquisition_channel, label("Email"));
    }

    #[test]
    fn test_run_pipeline_reports_mode_and_pool() {
        let mut source = InMemoryRecordSource::new();
        source
            .add_records(SourceName::Customers, &[CustomerRecord::new(1, label("Email"))])
            .unwrap();
        source
            .add_records(SourceName::Spend, &[SpendRecord::new("s1", label("Email"), 5.0)])
            .unwrap();
        source
            .add_records(
                SourceName::Touchpoints,
                &[TouchpointRecord::new("t1", 1, label("Email"), true)],
            )
            .unwrap();

        let report = run_pipeline(&source, &simple_config()).unwrap();
        assert_eq!(report.attribution_mode, "simple");
        assert_eq!(report.total_indirect_pool, 10_000.0);
        let email = report.row("Email").unwrap();
        assert_eq!(email.true_total_cost, 5.0 + 10_000.0 + 140.0);
    }
}
