//! Summary counts for the stats cards.

use crate::types::{Lead, LeadStatus, StatsSnapshot, UpstreamStats};

/// Count leads per status in a single pass.
///
/// `total` is the number of leads; statuses with no leads count zero.
pub fn aggregate(leads: &[Lead]) -> StatsSnapshot {
    let mut stats = StatsSnapshot::default();
    for lead in leads {
        *stats.bucket_mut(lead.status) += 1;
        stats.total += 1;
    }
    stats
}

impl UpstreamStats {
    /// Project a local snapshot into upstream's grouping.
    pub fn from_snapshot(stats: &StatsSnapshot) -> Self {
        Self {
            total_leads: stats.total,
            new_leads: stats.new,
            qualified_leads: stats.qualified + stats.contacted,
            converted_leads: stats.converted,
            lost_leads: stats.lost,
        }
    }

    /// Whether upstream's precomputed numbers describe the same lead set.
    pub fn agrees_with(&self, stats: &StatsSnapshot) -> bool {
        *self == Self::from_snapshot(stats)
    }
}

/// Share of leads in `status`, as a whole percentage. Zero for an empty set.
pub fn percent_of_total(stats: &StatsSnapshot, status: LeadStatus) -> u32 {
    if stats.total == 0 {
        return 0;
    }
    ((stats.count(status) as f64 / stats.total as f64) * 100.0).round() as u32
}
