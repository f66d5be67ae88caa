//! Scripted [`LeadSource`] for controller and poller tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{watch, Notify};

use crate::error::SourceError;
use crate::leads::client::LeadSource;
use crate::types::{RawRecord, UpstreamStats};

/// One scripted response to `fetch_records`.
#[derive(Debug, Clone)]
pub enum Step {
    Rows(Vec<RawRecord>),
    Status(u16),
    Malformed,
}

pub fn row(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("row must be a JSON object, got {}", other),
    }
}

pub fn sheet_rows() -> Vec<RawRecord> {
    vec![
        row(json!({"user id ": "687b5f21e69e7539", "name ": "Adnan Khan", "gym name ": "WTT Exclusive Fitness", "phone number ": "7351203447", "status ": "new"})),
        row(json!({"user id ": "123b5f21e69e7540", "name ": "Priya Sharma", "gym name ": "PowerHouse Gym", "phone number ": "9876543210", "status ": "contacted"})),
        row(json!({"user id ": "456b5f21e69e7541", "name ": "Rajesh Kumar", "gym name ": "Elite Fitness Center", "phone number ": "8765432109", "status ": "qualified"})),
    ]
}

/// Answers from a queue of [`Step`]s; once the queue is empty every fetch
/// returns `fallback`.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Step>>,
    fallback: Vec<RawRecord>,
    /// Count of `fetch_records` calls so far.
    entered: watch::Sender<usize>,
    /// Call count when `hold` was last called.
    held_at: AtomicUsize,
    gated: AtomicBool,
    gate: Notify,
    stats: Mutex<Option<Result<UpstreamStats, u16>>>,
    refresh_status: Mutex<Option<u16>>,
    refresh_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(fallback: Vec<RawRecord>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            entered: watch::channel(0).0,
            held_at: AtomicUsize::new(0),
            gated: AtomicBool::new(false),
            gate: Notify::new(),
            stats: Mutex::new(None),
            refresh_status: Mutex::new(None),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, step: Step) {
        self.script.lock().push_back(step);
    }

    /// Hold every fetch until [`release`](Self::release) is called.
    pub fn hold(&self) {
        self.held_at.store(self.calls(), Ordering::SeqCst);
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Resolves once a fetch has started since the last `hold`.
    pub async fn wait_entered(&self) {
        let held_at = self.held_at.load(Ordering::SeqCst);
        let mut rx = self.entered.subscribe();
        let _ = rx.wait_for(|calls| *calls > held_at).await;
    }

    pub fn calls(&self) -> usize {
        *self.entered.borrow()
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn serve_stats(&self, stats: Result<UpstreamStats, u16>) {
        *self.stats.lock() = Some(stats);
    }

    pub fn fail_upstream_refresh(&self, status: u16) {
        *self.refresh_status.lock() = Some(status);
    }
}

#[async_trait]
impl LeadSource for ScriptedSource {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError> {
        self.entered.send_modify(|calls| *calls += 1);
        if self.gated.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        let step = self.script.lock().pop_front();
        match step {
            Some(Step::Rows(rows)) => Ok(rows),
            Some(Step::Status(status)) => Err(SourceError::Status {
                status,
                message: "scripted failure".to_string(),
            }),
            Some(Step::Malformed) => Err(SourceError::Malformed(
                "expected a JSON array, got object".to_string(),
            )),
            None => Ok(self.fallback.clone()),
        }
    }

    async fn fetch_stats(&self) -> Result<Option<UpstreamStats>, SourceError> {
        match *self.stats.lock() {
            None => Ok(None),
            Some(Ok(stats)) => Ok(Some(stats)),
            Some(Err(status)) => Err(SourceError::Status {
                status,
                message: "stats unavailable".to_string(),
            }),
        }
    }

    async fn trigger_upstream_refresh(&self) -> Result<(), SourceError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match *self.refresh_status.lock() {
            None => Ok(()),
            Some(status) => Err(SourceError::Status {
                status,
                message: "refresh rejected".to_string(),
            }),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
