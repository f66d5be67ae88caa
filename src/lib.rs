pub mod config;
pub mod error;
pub mod leads;
pub mod types;

pub use error::{ConfigError, SourceError, SourceErrorKind};
pub use leads::controller::{LeadSyncController, RefreshOutcome};
pub use leads::LeadSyncConfig;
pub use types::{Lead, LeadStatus, StatsSnapshot, SyncPhase, SyncState};
