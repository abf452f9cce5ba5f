use crate::channel::ChannelLabel;
use std::collections::BTreeMap;

/// Splits `pool` across channels in proportion to their converted sessions.
///
/// The shares sum to `pool` up to floating-point rounding. When no channel
/// has a converted session every channel gets 0.
pub fn allocate_indirect_cost(
    sessions: &BTreeMap<ChannelLabel, u64>,
    pool: f64,
) -> BTreeMap<ChannelLabel, f64> {
    let total: u64 = sessions.values().sum();

    sessions
        .iter()
        .map(|(channel, count)| {
            let share = if total == 0 {
                0.0
            } else {
                (*count as f64 / total as f64) * pool
            };
            (channel.clone(), share)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions(counts: &[(&str, u64)]) -> BTreeMap<ChannelLabel, u64> {
        counts
            .iter()
            .map(|(name, count)| (ChannelLabel::new(*name).unwrap(), *count))
            .collect()
    }

    #[test]
    fn test_single_channel_takes_whole_pool() {
        let allocated = allocate_indirect_cost(&sessions(&[("Email", 1)]), 10_000.0);
        assert_eq!(allocated.get("Email"), Some(&10_000.0));
    }

    #[test]
    fn test_shares_are_proportional_and_sum_to_pool() {
        let allocated = allocate_indirect_cost(
            &sessions(&[("Email", 1), ("Google", 2), ("TikTok", 4)]),
            10_000.0,
        );

        let sum: f64 = allocated.values().sum();
        assert!((sum - 10_000.0).abs() < 1e-6);
        let email = allocated["Email"];
        let google = allocated["Google"];
        assert!((google - 2.0 * email).abs() < 1e-9);
        assert!((allocated["TikTok"] - 40_000.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_awkward_ratios_still_sum_to_pool() {
        let allocated = allocate_indirect_cost(
            &sessions(&[("A", 3), ("B", 7), ("C", 11), ("D", 13), ("E", 17)]),
            10_000.0,
        );
        let sum: f64 = allocated.values().sum();
        assert!((sum - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_sessions_allocates_nothing() {
        let allocated = allocate_indirect_cost(&sessions(&[("Email", 0), ("Google", 0)]), 10_000.0);
        assert_eq!(allocated.len(), 2);
        assert!(allocated.values().all(|v| *v == 0.0));

        assert!(allocate_indirect_cost(&BTreeMap::new(), 10_000.0).is_empty());
    }
}
