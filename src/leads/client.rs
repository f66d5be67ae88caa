//! HTTP client for the lead sheet endpoints.
//!
//! Uses reqwest with a per-request timeout. Three endpoints:
//! - records: GET, JSON array of row objects (required)
//! - stats: GET, JSON object of precomputed aggregates (optional)
//! - refresh: POST, makes the upstream re-read the sheet (optional)

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ConfigError, SourceError};
use crate::leads::LeadSyncConfig;
use crate::types::{RawRecord, UpstreamStats};

/// Rows returned by a connection probe.
const PROBE_SAMPLE_SIZE: usize = 2;

/// Result of a "test connection" probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProbe {
    pub total_records: usize,
    pub sample: Vec<RawRecord>,
}

/// Where lead rows come from. The controller only talks to this trait so
/// tests can swap the network out.
#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError>;

    /// Precomputed aggregates, when the source has them.
    async fn fetch_stats(&self) -> Result<Option<UpstreamStats>, SourceError> {
        Ok(None)
    }

    /// Ask the upstream to re-read the sheet before the next fetch.
    async fn trigger_upstream_refresh(&self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Fetch the records and report how many rows there are, with a short
    /// sample. Nothing is normalized or published.
    async fn probe(&self) -> Result<ConnectionProbe, SourceError> {
        let records = self.fetch_records().await?;
        Ok(ConnectionProbe {
            total_records: records.len(),
            sample: records.into_iter().take(PROBE_SAMPLE_SIZE).collect(),
        })
    }

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Parse a records response body.
///
/// The body must be a JSON array. Array elements that are not objects
/// become empty records so the row count survives.
pub fn parse_records(body: &str) -> Result<Vec<RawRecord>, SourceError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SourceError::Malformed(format!("invalid JSON: {}", e)))?;

    let rows = match value {
        Value::Array(rows) => rows,
        other => {
            return Err(SourceError::Malformed(format!(
                "expected a JSON array, got {}",
                json_type_name(&other)
            )))
        }
    };

    Ok(rows
        .into_iter()
        .map(|row| match row {
            Value::Object(map) => map,
            _ => RawRecord::new(),
        })
        .collect())
}

/// Parse a stats response body.
pub fn parse_stats(body: &str) -> Result<UpstreamStats, SourceError> {
    serde_json::from_str(body)
        .map_err(|e| SourceError::Malformed(format!("invalid stats object: {}", e)))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// reqwest-backed [`LeadSource`].
pub struct HttpLeadSource {
    client: reqwest::Client,
    records_url: String,
    stats_url: Option<String>,
    refresh_url: Option<String>,
}

impl HttpLeadSource {
    pub fn new(config: &LeadSyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self {
            client,
            records_url: config.source_url.trim().to_string(),
            stats_url: non_blank(config.stats_url.as_deref()),
            refresh_url: non_blank(config.refresh_url.as_deref()),
        })
    }

    pub fn records_url(&self) -> &str {
        &self.records_url
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let resp = self.client.get(url).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.text().await?)
    }
}

fn non_blank(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = if text.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        text.chars().take(200).collect()
    };
    Err(SourceError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl LeadSource for HttpLeadSource {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError> {
        let body = self.get_text(&self.records_url).await?;
        parse_records(&body)
    }

    async fn fetch_stats(&self) -> Result<Option<UpstreamStats>, SourceError> {
        let Some(url) = self.stats_url.as_deref() else {
            return Ok(None);
        };
        let body = self.get_text(url).await?;
        parse_stats(&body).map(Some)
    }

    async fn trigger_upstream_refresh(&self) -> Result<(), SourceError> {
        let Some(url) = self.refresh_url.as_deref() else {
            return Ok(());
        };
        let resp = self.client.post(url).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.records_url.clone()
    }
}
