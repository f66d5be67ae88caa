use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row as returned by the source endpoint, before normalization.
///
/// Keys arrive with whatever casing and padding the spreadsheet header
/// had ("name ", "Phone Number", ...). Values are usually strings but
/// may be numbers, booleans or null.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Pipeline status of a lead.
///
/// Closed set: anything the source sends that is not one of these five
/// values becomes `New` (see [`LeadStatus::parse_lenient`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    /// Badge label shown in the leads table.
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Converted => "Converted",
            LeadStatus::Lost => "Lost",
        }
    }

    /// Trim + lower-case, then match exactly. Unknown or empty input is `New`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or(LeadStatus::New)
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "converted" => Ok(LeadStatus::Converted),
            "lost" => Ok(LeadStatus::Lost),
            _ => Err(format!("Unknown lead status: {}", s)),
        }
    }
}

/// Where a lead's `id` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdSource {
    /// Taken from the row's own id column.
    Source,
    /// Derived from the row's position in the fetched array. Only stable
    /// within a single cycle.
    Positional,
}

/// Canonical lead record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub id_source: IdSource,
    pub name: String,
    pub phone_number: String,
    pub gym_name: String,
    pub status: LeadStatus,
    /// `None` means unknown recency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// First letter of the name, upper-cased, for the avatar bubble.
    pub fn initial(&self) -> Option<char> {
        self.name.chars().next().map(|c| c.to_ascii_uppercase())
    }

    /// Id truncated to 8 characters, as shown under the lead's name.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// Summary counts derived from one lead set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total: usize,
    pub new: usize,
    pub contacted: usize,
    pub qualified: usize,
    pub converted: usize,
    pub lost: usize,
}

impl StatsSnapshot {
    pub fn count(&self, status: LeadStatus) -> usize {
        match status {
            LeadStatus::New => self.new,
            LeadStatus::Contacted => self.contacted,
            LeadStatus::Qualified => self.qualified,
            LeadStatus::Converted => self.converted,
            LeadStatus::Lost => self.lost,
        }
    }

    pub(crate) fn bucket_mut(&mut self, status: LeadStatus) -> &mut usize {
        match status {
            LeadStatus::New => &mut self.new,
            LeadStatus::Contacted => &mut self.contacted,
            LeadStatus::Qualified => &mut self.qualified,
            LeadStatus::Converted => &mut self.converted,
            LeadStatus::Lost => &mut self.lost,
        }
    }

    /// Every status with its count, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (LeadStatus, usize)> + '_ {
        LeadStatus::ALL.iter().map(move |s| (*s, self.count(*s)))
    }

    /// Sum of the per-status buckets. Equals `total` for aggregated snapshots.
    pub fn counted(&self) -> usize {
        self.iter().map(|(_, n)| n).sum()
    }
}

/// Precomputed aggregate served by the upstream stats endpoint.
///
/// Upstream folds `contacted` into `qualified_leads`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamStats {
    #[serde(default)]
    pub total_leads: usize,
    #[serde(default)]
    pub new_leads: usize,
    #[serde(default)]
    pub qualified_leads: usize,
    #[serde(default)]
    pub converted_leads: usize,
    #[serde(default)]
    pub lost_leads: usize,
}

/// Phase of the sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Loading,
    Error,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "idle"),
            SyncPhase::Loading => write!(f, "loading"),
            SyncPhase::Error => write!(f, "error"),
        }
    }
}

/// Everything the dashboard renders. Published by the sync controller;
/// consumers only ever see clones.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub leads: Vec<Lead>,
    pub stats: StatsSnapshot,
    pub phase: SyncPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_stats: Option<UpstreamStats>,
    /// Number of successful publishes so far.
    pub cycle: u64,
}

impl SyncState {
    pub fn is_loading(&self) -> bool {
        self.phase == SyncPhase::Loading
    }

    pub fn has_error(&self) -> bool {
        self.phase == SyncPhase::Error
    }
}
