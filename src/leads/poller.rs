//! Background lead sync poller.
//!
//! Owned by a [`LeadSyncController`]: started with `start()`, stopped with
//! `stop()`/`dispose()`. Runs one cycle immediately (unless
//! `refreshOnStart` is off), then sleeps `pollIntervalSecs` between cycles
//! or until woken by `request_refresh()`.
//!
//! Holds only a `Weak` to the controller, so dropping the last handle
//! ends the task as well.

use std::sync::Weak;

use tokio::sync::watch;

use crate::leads::controller::LeadSyncController;

pub async fn run_lead_poller(
    controller: Weak<LeadSyncController>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (interval, refresh_on_start, wake) = match controller.upgrade() {
        Some(c) => {
            let config = c.config();
            (config.poll_interval(), config.refresh_on_start, c.wake_handle())
        }
        None => return,
    };
    log::info!("Lead poller: started, interval {}s", interval.as_secs());

    let mut run_cycle = refresh_on_start;
    loop {
        if *shutdown.borrow() {
            break;
        }

        if run_cycle {
            let Some(c) = controller.upgrade() else {
                break;
            };
            tokio::select! {
                outcome = c.refresh() => {
                    log::debug!("Lead poller: cycle finished: {:?}", outcome);
                }
                _ = shutdown.changed() => {
                    log::debug!("Lead poller: shutdown during cycle");
                    break;
                }
            }
        }
        run_cycle = true;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                log::debug!("Lead poller: interval elapsed");
            }
            _ = wake.notified() => {
                log::info!("Lead poller: woken by manual sync signal");
            }
            _ = shutdown.changed() => {
                break;
            }
        }
    }

    log::info!("Lead poller: stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::leads::client::LeadSource;
    use crate::leads::controller::LeadSyncController;
    use crate::leads::test_support::{sheet_rows, ScriptedSource, Step};
    use crate::leads::LeadSyncConfig;
    use crate::types::SyncPhase;

    fn controller_with(
        source: &Arc<ScriptedSource>,
        config: LeadSyncConfig,
    ) -> Arc<LeadSyncController> {
        Arc::new(LeadSyncController::new(
            config,
            source.clone() as Arc<dyn LeadSource>,
        ))
    }

    fn five_minutes() -> LeadSyncConfig {
        LeadSyncConfig {
            poll_interval_secs: 300,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_start_then_every_interval() {
        let source = Arc::new(ScriptedSource::new(sheet_rows()));
        let controller = controller_with(&source, five_minutes());
        controller.start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(controller.snapshot().stats.total, 3);

        tokio::time::sleep(Duration::from_secs(298)).await;
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.calls(), 2);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(), 3);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_on_start_disabled_waits_for_interval() {
        let source = Arc::new(ScriptedSource::new(sheet_rows()));
        let config = LeadSyncConfig {
            refresh_on_start: false,
            ..five_minutes()
        };
        let controller = controller_with(&source, config);
        controller.start();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.calls(), 0);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(), 1);

        controller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_cycles_after_stop() {
        let source = Arc::new(ScriptedSource::new(sheet_rows()));
        let controller = controller_with(&source, five_minutes());
        controller.start();
        assert!(controller.is_polling());

        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.stop().await;
        assert!(!controller.is_polling());
        let before = controller.snapshot();

        tokio::time::sleep(Duration::from_secs(3_000)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(controller.snapshot().cycle, before.cycle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_start_resumes() {
        let source = Arc::new(ScriptedSource::new(sheet_rows()));
        let controller = controller_with(&source, five_minutes());
        controller.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.stop().await;

        controller.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 2);

        controller.dispose().await;
        controller.start();
        assert!(!controller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_runs_one_poller() {
        let source = Arc::new(ScriptedSource::new(sheet_rows()));
        let controller = controller_with(&source, five_minutes());
        controller.start();
        controller.start();

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(source.calls(), 2);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_wake_runs_early_cycle() {
        let source = Arc::new(ScriptedSource::new(sheet_rows()));
        let controller = controller_with(&source, five_minutes());
        controller.start();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 1);

        controller.request_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 2);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_timer_cycle_retries_on_next_tick() {
        let source = Arc::new(ScriptedSource::new(sheet_rows()));
        source.push(Step::Status(500));
        let controller = controller_with(&source, five_minutes());
        controller.start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.snapshot().phase, SyncPhase::Error);

        tokio::time::sleep(Duration::from_secs(300)).await;
        let state = controller.snapshot();
        assert_eq!(state.phase, SyncPhase::Idle);
        assert_eq!(state.stats.total, 3);
        assert_eq!(source.calls(), 2);

        controller.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_during_timer_cycle_publishes_nothing() {
        let source = Arc::new(ScriptedSource::new(sheet_rows()));
        source.hold();
        let controller = controller_with(&source, five_minutes());
        controller.start();

        source.wait_entered().await;
        controller.dispose().await;
        source.release();

        tokio::time::sleep(Duration::from_secs(1_000)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(controller.snapshot().cycle, 0);
        assert!(controller.snapshot().leads.is_empty());
    }
}
