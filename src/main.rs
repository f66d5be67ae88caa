//! Leadboard headless sync.
//!
//! Loads ~/.leadboard/config.json, polls the lead sheet on the configured
//! interval and logs each published snapshot until Ctrl-C.
//!
//! Usage: `RUST_LOG=debug leadboard`

use std::sync::Arc;

use chrono::Utc;

use leadboard::config::load_config;
use leadboard::leads::activity::{recent_activity, DEFAULT_ACTIVITY_LIMIT};
use leadboard::leads::stats::percent_of_total;
use leadboard::{LeadStatus, LeadSyncController, SyncState};

fn log_snapshot(state: &SyncState) {
    if state.is_loading() {
        log::info!("Syncing...");
        return;
    }
    if let Some(message) = state.error_message.as_deref() {
        log::warn!("Sync error: {}", message);
    }
    if state.cycle == 0 {
        return;
    }

    let stats = &state.stats;
    log::info!(
        "{} leads | new {} | contacted {} | qualified {} ({}%) | converted {} ({}%) | lost {}",
        stats.total,
        stats.new,
        stats.contacted,
        stats.qualified,
        percent_of_total(stats, LeadStatus::Qualified),
        stats.converted,
        percent_of_total(stats, LeadStatus::Converted),
        stats.lost
    );
    for lead in &state.leads {
        log::debug!(
            "  [{}] {} ({}) {} | {} | {}",
            lead.initial().unwrap_or('?'),
            lead.name,
            lead.short_id(),
            lead.status.label(),
            lead.gym_name,
            lead.phone_number
        );
    }
    for entry in recent_activity(&state.leads, DEFAULT_ACTIVITY_LIMIT, Utc::now()) {
        log::info!(
            "  {}: {} ({})",
            entry.action,
            entry.lead_name,
            entry.recency.label()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config =
        load_config().map_err(|e| anyhow::anyhow!("Failed to load leadboard config: {e}"))?;
    let controller = Arc::new(
        LeadSyncController::from_config(config)
            .map_err(|e| anyhow::anyhow!("Failed to build lead source: {e}"))?,
    );
    log::info!("Leadboard: syncing from {}", controller.source_description());

    let mut updates = controller.subscribe();
    controller.start();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                log_snapshot(&state);
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Leadboard: shutting down");
                break;
            }
        }
    }

    controller.dispose().await;
    Ok(())
}
