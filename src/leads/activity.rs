//! Recent-activity feed and "added" recency labels.
//!
//! Derived purely from the published leads; nothing here is stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Lead, LeadStatus};

/// Entries shown in the dashboard's activity panel.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 3;

/// How long ago a lead was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Recency {
    JustNow,
    Minutes(i64),
    Hours(i64),
    Days(i64),
    /// Source row had no usable timestamp.
    Unknown,
}

impl Recency {
    pub fn from_created_at(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(created_at) = created_at else {
            return Recency::Unknown;
        };
        // Clock skew between sheet and host: future timestamps read as "just now".
        let elapsed = now.signed_duration_since(created_at);
        if elapsed.num_minutes() < 1 {
            Recency::JustNow
        } else if elapsed.num_hours() < 1 {
            Recency::Minutes(elapsed.num_minutes())
        } else if elapsed.num_days() < 1 {
            Recency::Hours(elapsed.num_hours())
        } else {
            Recency::Days(elapsed.num_days())
        }
    }

    pub fn label(&self) -> String {
        fn plural(n: i64, unit: &str) -> String {
            if n == 1 {
                format!("1 {} ago", unit)
            } else {
                format!("{} {}s ago", n, unit)
            }
        }
        match self {
            Recency::JustNow => "just now".to_string(),
            Recency::Minutes(n) => plural(*n, "minute"),
            Recency::Hours(n) => plural(*n, "hour"),
            Recency::Days(n) => plural(*n, "day"),
            Recency::Unknown => "unknown".to_string(),
        }
    }
}

/// Icon/colour bucket for an activity entry. Contacted shares the
/// qualified bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    New,
    Qualified,
    Converted,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub lead_id: String,
    pub lead_name: String,
    pub action: &'static str,
    pub kind: ActivityKind,
    pub recency: Recency,
}

fn describe(status: LeadStatus) -> (&'static str, ActivityKind) {
    match status {
        LeadStatus::New => ("New lead added", ActivityKind::New),
        LeadStatus::Contacted => ("Lead contacted", ActivityKind::Qualified),
        LeadStatus::Qualified => ("Lead qualified", ActivityKind::Qualified),
        LeadStatus::Converted => ("Lead converted", ActivityKind::Converted),
        LeadStatus::Lost => ("Lead marked as lost", ActivityKind::Lost),
    }
}

/// The first `limit` leads, in source order, as activity entries.
pub fn recent_activity(leads: &[Lead], limit: usize, now: DateTime<Utc>) -> Vec<ActivityEntry> {
    leads
        .iter()
        .take(limit)
        .map(|lead| {
            let (action, kind) = describe(lead.status);
            ActivityEntry {
                lead_id: lead.id.clone(),
                lead_name: lead.name.clone(),
                action,
                kind,
                recency: Recency::from_created_at(lead.created_at, now),
            }
        })
        .collect()
}
