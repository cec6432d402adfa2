// src/pipeline/watch.rs

//! Periodic refresh loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::pipeline::cycle::{CycleOutcome, CycleStatus, SchedulePipeline};

/// Shortest accepted refresh period.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Sender half used to request an immediate refresh.
pub type RefreshTrigger = mpsc::Sender<()>;

/// Create a manual refresh channel.
pub fn refresh_channel() -> (RefreshTrigger, mpsc::Receiver<()>) {
    mpsc::channel(4)
}

/// Run cycles on a fixed interval until `shutdown` resolves.
///
/// The first cycle runs immediately. A message on `triggers` runs an extra
/// cycle; the interval is not reset by it. Ticks missed while a cycle was
/// running are skipped rather than replayed. A zero interval is raised to
/// [`MIN_INTERVAL`].
pub async fn run_watcher<F>(
    pipeline: Arc<SchedulePipeline>,
    interval: Duration,
    mut triggers: mpsc::Receiver<()>,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    if interval < MIN_INTERVAL {
        log::warn!(
            "Watch interval {:?} is too short, using {:?}",
            interval,
            MIN_INTERVAL
        );
    }
    let interval = interval.max(MIN_INTERVAL);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut triggers_open = true;
    let mut cycles = 0;

    log::info!("Watching schedule every {}s", interval.as_secs());

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Watcher stopping after {} cycles", cycles);
                break;
            }
            _ = ticker.tick() => {}
            trigger = triggers.recv(), if triggers_open => {
                if trigger.is_none() {
                    triggers_open = false;
                    continue;
                }
                log::info!("Manual refresh requested");
            }
        }

        let outcome = pipeline.run_cycle().await;
        cycles += 1;
        log_outcome(&outcome);
    }

    cycles
}

fn log_outcome(outcome: &CycleOutcome) {
    match &outcome.status {
        CycleStatus::Baseline => log::info!(
            "Baseline recorded: {} rows for '{}'",
            outcome.data.queue_schedules.len(),
            outcome.data.date
        ),
        CycleStatus::Unchanged => log::info!("No schedule change"),
        CycleStatus::Changed { diff } => log::info!(
            "Schedule changed: {}",
            diff.affected_labels().join(", ")
        ),
        CycleStatus::Fallback { reason } => log::warn!("Fallback in use: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetcherConfig, NotifierConfig, ParserConfig};
    use crate::services::{RecordingNotifier, ScheduleFetcher, ScheduleParser};
    use crate::storage::MemoryStorage;
    use crate::test_support::{TestServer, schedule_page};

    fn pipeline(url: &str) -> Arc<SchedulePipeline> {
        let config = FetcherConfig {
            url: url.to_string(),
            timeout_secs: 5,
            try_alternatives: false,
            ..FetcherConfig::default()
        };
        Arc::new(SchedulePipeline::new(
            ScheduleFetcher::new(&config).unwrap(),
            ScheduleParser::new(&ParserConfig::default()).unwrap(),
            Arc::new(MemoryStorage::new()),
            Arc::new(RecordingNotifier::default()),
            NotifierConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_manual_trigger_runs_extra_cycle() {
        let server = TestServer::start(vec![(200, schedule_page(0..0))]).await;
        let pipeline = pipeline(&server.url());
        let (trigger, triggers) = refresh_channel();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let watcher = tokio::spawn(run_watcher(
            Arc::clone(&pipeline),
            Duration::from_secs(3600),
            triggers,
            async move {
                let _ = stop_rx.await;
            },
        ));

        // Wait for the immediate first cycle.
        while pipeline.latest().await.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        trigger.send(()).await.unwrap();
        while server.hits() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // Let the triggered cycle finish before stopping.
        while pipeline.latest().await.map(|o| o.status) != Some(CycleStatus::Unchanged) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        stop_tx.send(()).unwrap();
        let cycles = watcher.await.unwrap();
        assert_eq!(cycles, 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick_completes() {
        let pipeline = pipeline("http://127.0.0.1:9/");
        let (_trigger, triggers) = refresh_channel();

        let cycles = run_watcher(pipeline, Duration::from_secs(3600), triggers, async {}).await;
        assert!(cycles <= 1);
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_panic() {
        let server = TestServer::start(vec![(200, schedule_page(0..0))]).await;
        let pipeline = pipeline(&server.url());
        let (_trigger, triggers) = refresh_channel();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let watcher = tokio::spawn(run_watcher(
            Arc::clone(&pipeline),
            Duration::ZERO,
            triggers,
            async move {
                let _ = stop_rx.await;
            },
        ));
        while pipeline.latest().await.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        stop_tx.send(()).unwrap();
        assert!(watcher.await.unwrap() >= 1);
    }
}
