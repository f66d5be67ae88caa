//! Lead sheet synchronization.
//!
//! Pulls lead rows from a spreadsheet-backed JSON endpoint, normalizes
//! them, derives summary counts and publishes the result for the
//! dashboard. `client` talks HTTP, `poller` owns the timer,
//! `controller` owns the state machine.

pub mod activity;
pub mod client;
pub mod controller;
pub mod normalize;
pub mod poller;
pub mod stats;
#[cfg(test)]
pub(crate) mod test_support;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Sheet the dashboard was originally wired to.
pub const DEFAULT_SOURCE_URL: &str =
    "https://opensheet.elk.sh/1RsvlpFEVERK8myvdbQnlbt6yB2uz6gPHe9PqDpIbEdw/Sheet1";

/// Lead sync configuration stored in ~/.leadboard/config.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSyncConfig {
    #[serde(default = "default_source_url")]
    pub source_url: String,
    /// Endpoint serving precomputed aggregates. Optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_url: Option<String>,
    /// Endpoint that makes the upstream re-read the sheet. POSTed before
    /// each fetch when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_refresh_on_start")]
    pub refresh_on_start: bool,
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_refresh_on_start() -> bool {
    true
}

impl Default for LeadSyncConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            stats_url: None,
            refresh_url: None,
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            refresh_on_start: default_refresh_on_start(),
        }
    }
}

impl LeadSyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_url.trim().is_empty() {
            return Err(ConfigError::EmptySourceUrl);
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: LeadSyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LeadSyncConfig::default());
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.refresh_on_start);
    }

    #[test]
    fn test_camel_case_fields() {
        let config: LeadSyncConfig = serde_json::from_str(
            r#"{"sourceUrl":"http://localhost:8001/api/leads","pollIntervalSecs":60,"statsUrl":"http://localhost:8001/api/stats"}"#,
        )
        .unwrap();
        assert_eq!(config.source_url, "http://localhost:8001/api/leads");
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(
            config.stats_url.as_deref(),
            Some("http://localhost:8001/api/stats")
        );
        assert!(config.refresh_url.is_none());
    }

    #[test]
    fn test_validate_rejects_blank_url_and_zero_durations() {
        let blank = LeadSyncConfig {
            source_url: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(blank.validate(), Err(ConfigError::EmptySourceUrl)));

        let zero = LeadSyncConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::ZeroPollInterval)));

        let no_timeout = LeadSyncConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            no_timeout.validate(),
            Err(ConfigError::ZeroRequestTimeout)
        ));

        assert!(LeadSyncConfig::default().validate().is_ok());
    }
}
