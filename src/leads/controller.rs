//! Lead sync controller.
//!
//! Owns the published [`SyncState`] and runs sync cycles:
//! upstream refresh → fetch → normalize → aggregate → publish.
//!
//! State machine: `Idle → Loading → Idle | Error`, and `Error → Loading`
//! on the next trigger. At most one cycle is in flight; a trigger that
//! arrives while `Loading` is dropped, not queued. While a cycle runs the
//! previous leads and stats stay published.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::error::{ConfigError, SourceError, SourceErrorKind};
use crate::leads::client::{ConnectionProbe, HttpLeadSource, LeadSource};
use crate::leads::normalize::normalize;
use crate::leads::stats::aggregate;
use crate::leads::LeadSyncConfig;
use crate::types::{Lead, StatsSnapshot, SyncPhase, SyncState, UpstreamStats};

/// What a call to [`LeadSyncController::refresh`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New leads and stats were published.
    Completed { leads: usize },
    /// The cycle failed; last good data is still published.
    Failed {
        kind: SourceErrorKind,
        message: String,
    },
    /// Another cycle was already in flight.
    Coalesced,
    /// The controller has been disposed.
    Disposed,
}

struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Output of one successful cycle, published as a unit.
struct Cycle {
    leads: Vec<Lead>,
    stats: StatsSnapshot,
    upstream: Option<UpstreamStats>,
}

/// Puts the phase back if a cycle's future is dropped before it publishes.
struct CycleGuard<'a> {
    state: &'a watch::Sender<SyncState>,
    previous: Option<(SyncPhase, Option<String>)>,
}

impl CycleGuard<'_> {
    /// Hand back the phase this cycle replaced.
    fn disarm(mut self) -> (SyncPhase, Option<String>) {
        self.previous.take().unwrap_or_default()
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if let Some((phase, error_message)) = self.previous.take() {
            log::warn!("Lead sync: cycle abandoned before publishing, restoring {}", phase);
            self.state.send_modify(|state| {
                state.phase = phase;
                state.error_message = error_message;
            });
        }
    }
}

pub struct LeadSyncController {
    config: RwLock<LeadSyncConfig>,
    source: RwLock<Arc<dyn LeadSource>>,
    state: watch::Sender<SyncState>,
    wake: Arc<Notify>,
    disposed: AtomicBool,
    poller: Mutex<Option<PollerHandle>>,
}

impl LeadSyncController {
    pub fn new(config: LeadSyncConfig, source: Arc<dyn LeadSource>) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            config: RwLock::new(config),
            source: RwLock::new(source),
            state,
            wake: Arc::new(Notify::new()),
            disposed: AtomicBool::new(false),
            poller: Mutex::new(None),
        }
    }

    /// Controller backed by the HTTP endpoints named in `config`.
    pub fn from_config(config: LeadSyncConfig) -> Result<Self, ConfigError> {
        let source = HttpLeadSource::new(&config)?;
        Ok(Self::new(config, Arc::new(source)))
    }

    /// Current published state.
    pub fn snapshot(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every publish, including phase changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> LeadSyncConfig {
        self.config.read().clone()
    }

    pub fn source_description(&self) -> String {
        self.source.read().describe()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn wake_handle(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// Point the controller at a different records endpoint. Applies from
    /// the next cycle; a cycle already in flight finishes against the old one.
    pub fn configure(&self, source_url: &str) -> Result<(), ConfigError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(ConfigError::EmptySourceUrl);
        }

        let mut config = self.config.write();
        let next = LeadSyncConfig {
            source_url: source_url.to_string(),
            ..config.clone()
        };
        let source = HttpLeadSource::new(&next)?;
        *self.source.write() = Arc::new(source);
        *config = next;

        log::info!("Lead sync: source set to {}", source_url);
        Ok(())
    }

    /// Check the current source without touching published state.
    pub async fn probe(&self) -> Result<ConnectionProbe, SourceError> {
        let source = self.source.read().clone();
        source.probe().await
    }

    /// Run one sync cycle now.
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut previous = None;
        let mut disposed = false;
        let started = self.state.send_if_modified(|state| {
            if self.is_disposed() {
                disposed = true;
                return false;
            }
            if state.phase == SyncPhase::Loading {
                return false;
            }
            previous = Some((state.phase, state.error_message.clone()));
            state.phase = SyncPhase::Loading;
            true
        });
        if disposed {
            return RefreshOutcome::Disposed;
        }
        if !started {
            log::debug!("Lead sync: cycle already in flight, trigger dropped");
            return RefreshOutcome::Coalesced;
        }
        let guard = CycleGuard {
            state: &self.state,
            previous,
        };

        let source = self.source.read().clone();
        log::info!("Lead sync: starting cycle against {}", source.describe());
        let result = run_cycle(source.as_ref()).await;
        let (previous_phase, previous_error) = guard.disarm();

        // The disposed check and the publish share the watch lock, which
        // `dispose` also takes to set the flag.
        let now = Utc::now();
        let mut outcome = RefreshOutcome::Disposed;
        let mut published = StatsSnapshot::default();
        self.state.send_modify(|state| {
            if self.is_disposed() {
                state.phase = previous_phase;
                state.error_message = previous_error;
                return;
            }
            match result {
                Ok(cycle) => {
                    outcome = RefreshOutcome::Completed {
                        leads: cycle.leads.len(),
                    };
                    state.leads = cycle.leads;
                    published = cycle.stats;
                    state.stats = cycle.stats;
                    state.upstream_stats = cycle.upstream;
                    state.phase = SyncPhase::Idle;
                    state.error_message = None;
                    state.last_synced_at = Some(now);
                    state.cycle += 1;
                }
                Err(e) => {
                    log::warn!("Lead sync: cycle failed: {}", e);
                    let message = e.user_message();
                    state.phase = SyncPhase::Error;
                    state.error_message = Some(message.clone());
                    outcome = RefreshOutcome::Failed {
                        kind: e.kind(),
                        message,
                    };
                }
            }
        });

        match &outcome {
            RefreshOutcome::Completed { leads } => {
                let stats = published;
                log::info!(
                    "Lead sync: published {} leads (new {}, contacted {}, qualified {}, converted {}, lost {})",
                    leads,
                    stats.new,
                    stats.contacted,
                    stats.qualified,
                    stats.converted,
                    stats.lost
                );
            }
            RefreshOutcome::Disposed => {
                log::debug!("Lead sync: disposed mid-cycle, result dropped");
            }
            _ => {}
        }
        outcome
    }

    /// Start the recurring trigger. Must be called inside a tokio runtime.
    /// No-op if already running or disposed.
    pub fn start(self: &Arc<Self>) {
        if self.is_disposed() {
            log::warn!("Lead sync: start ignored, controller disposed");
            return;
        }
        let mut poller = self.poller.lock();
        if poller.is_some() {
            log::debug!("Lead sync: poller already running");
            return;
        }
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(crate::leads::poller::run_lead_poller(
            Arc::downgrade(self),
            shutdown_rx,
        ));
        *poller = Some(PollerHandle { shutdown, task });
    }

    pub fn is_polling(&self) -> bool {
        self.poller.lock().is_some()
    }

    /// Wake the poller for an early cycle. Dropped if the poller is not
    /// currently waiting (not running, or mid-cycle).
    pub fn request_refresh(&self) {
        self.wake.notify_waiters();
    }

    /// Stop the recurring trigger and wait for the poller task to exit.
    /// The timer never fires after this returns. `start` may be called again.
    pub async fn stop(&self) {
        let handle = self.poller.lock().take();
        let Some(handle) = handle else {
            return;
        };
        let _ = handle.shutdown.send(true);
        if let Err(e) = handle.task.await {
            log::warn!("Lead sync: poller task ended abnormally: {}", e);
        }
    }

    /// Stop polling and refuse all further publishes. Irreversible.
    pub async fn dispose(&self) {
        // Set under the watch lock so no publish can straddle it.
        self.state.send_if_modified(|_| {
            self.disposed.store(true, Ordering::SeqCst);
            false
        });
        self.stop().await;
        log::info!("Lead sync: controller disposed");
    }
}

async fn run_cycle(source: &dyn LeadSource) -> Result<Cycle, SourceError> {
    source.trigger_upstream_refresh().await?;

    let raw = source.fetch_records().await?;
    let leads = normalize(&raw);
    let stats = aggregate(&leads);

    let upstream = match source.fetch_stats().await {
        Ok(Some(upstream)) => {
            if !upstream.agrees_with(&stats) {
                log::warn!(
                    "Lead sync: upstream stats disagree with fetched rows (upstream total {}, local total {})",
                    upstream.total_leads,
                    stats.total
                );
            }
            Some(upstream)
        }
        Ok(None) => None,
        Err(e) => {
            log::warn!("Lead sync: upstream stats unavailable: {}", e);
            None
        }
    };

    Ok(Cycle {
        leads,
        stats,
        upstream,
    })
}
