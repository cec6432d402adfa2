// src/pipeline/cycle.rs

//! One fetch → parse → diff → notify → store cycle.
//!
//! Fetch and parse failures never escape: they are turned into the
//! fallback schedule carrying the reason. Fallback cycles skip change
//! detection and are never persisted. Storage failures are logged and
//! swallowed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::error::Result;
use crate::models::{Config, NotifierConfig, ScheduleData};
use crate::pipeline::diff::{QueueDiff, changed};
use crate::services::{Notification, Notifier, ScheduleFetcher, ScheduleParser, fallback};
use crate::storage::SnapshotStore;

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CycleStatus {
    /// Live data with nothing to compare against
    Baseline,
    /// Live data equal to the previous timetable
    Unchanged,
    /// Live data with a different timetable; a notification was sent
    Changed { diff: QueueDiff },
    /// The page could not be fetched or parsed
    Fallback { reason: String },
}

/// Result of one cycle, always renderable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    pub data: ScheduleData,
    #[serde(flatten)]
    pub status: CycleStatus,
    pub finished_at: DateTime<Utc>,
}

impl CycleOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.status, CycleStatus::Fallback { .. })
    }
}

#[derive(Default)]
struct PipelineState {
    /// Set once the store has been read
    seeded: bool,
    /// Last live schedule, compared against the next one
    baseline: Option<ScheduleData>,
    /// When the baseline was accepted
    baseline_at: Option<DateTime<Utc>>,
    latest: Option<CycleOutcome>,
}

/// Orchestrates the schedule cycle.
///
/// Cycles are serialized by `cycle_gate`, so a manual refresh that arrives
/// while the timer-driven cycle is running waits for it. `state` is only
/// locked for short reads and writes, never across a fetch or store call.
pub struct SchedulePipeline {
    fetcher: ScheduleFetcher,
    parser: ScheduleParser,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    notifier_config: NotifierConfig,
    cycle_gate: Mutex<()>,
    state: RwLock<PipelineState>,
}

impl SchedulePipeline {
    pub fn new(
        fetcher: ScheduleFetcher,
        parser: ScheduleParser,
        store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
        notifier_config: NotifierConfig,
    ) -> Self {
        Self {
            fetcher,
            parser,
            store,
            notifier,
            notifier_config,
            cycle_gate: Mutex::new(()),
            state: RwLock::new(PipelineState::default()),
        }
    }

    /// Build the pipeline from configuration.
    ///
    /// The configuration is validated first.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            ScheduleFetcher::new(&config.fetcher)?,
            ScheduleParser::new(&config.parser)?,
            store,
            notifier,
            config.notifier.clone(),
        ))
    }

    /// Run one cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _cycle = self.cycle_gate.lock().await;
        self.seed().await;

        let outcome = match self.fetch_and_parse().await {
            Ok(data) => self.accept(data).await,
            Err(reason) => {
                log::warn!("Serving fallback schedule: {}", reason);
                CycleOutcome {
                    data: fallback(&reason),
                    status: CycleStatus::Fallback { reason },
                    finished_at: Utc::now(),
                }
            }
        };

        self.state.write().await.latest = Some(outcome.clone());
        outcome
    }

    /// Outcome of the most recent cycle, if any ran.
    pub async fn latest(&self) -> Option<CycleOutcome> {
        self.state.read().await.latest.clone()
    }

    /// When the current baseline was accepted.
    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.baseline_at
    }

    async fn fetch_and_parse(&self) -> std::result::Result<ScheduleData, String> {
        let html = self.fetcher.fetch().await.map_err(|e| e.to_string())?;
        log::info!("Fetched {} chars", html.chars().count());
        self.parser.parse(&html).map_err(|e| e.to_string())
    }

    /// Read the store once to obtain the baseline.
    async fn seed(&self) {
        if self.state.read().await.seeded {
            return;
        }

        let loaded = self.store.load().await;
        let mut state = self.state.write().await;
        state.seeded = true;
        match loaded {
            Ok(Some(snapshot)) => {
                log::info!(
                    "Loaded previous snapshot from {} ({})",
                    snapshot.updated_at,
                    snapshot.data.fingerprint()
                );
                state.baseline = Some(snapshot.data);
                state.baseline_at = Some(snapshot.updated_at);
            }
            Ok(None) => log::info!("No previous snapshot, next schedule becomes the baseline"),
            Err(e) => log::warn!("Could not read previous snapshot, starting fresh: {}", e),
        }
    }

    /// Compare, notify, persist and promote a live schedule.
    async fn accept(&self, data: ScheduleData) -> CycleOutcome {
        let now = Utc::now();
        let baseline = self.state.read().await.baseline.clone();

        let status = match &baseline {
            None => CycleStatus::Baseline,
            Some(previous) if changed(Some(previous), &data) => {
                let diff = QueueDiff::between(&previous.queue_schedules, &data.queue_schedules);
                self.send_change_notification(&diff).await;
                CycleStatus::Changed { diff }
            }
            Some(_) => CycleStatus::Unchanged,
        };

        log::info!(
            "Schedule {} ({})",
            match &status {
                CycleStatus::Baseline => "recorded as baseline",
                CycleStatus::Changed { .. } => "changed",
                _ => "unchanged",
            },
            data.fingerprint()
        );

        let snapshot = data.without_raw_html();
        if let Err(e) = self.store.save(&snapshot, now).await {
            log::warn!("Could not persist snapshot: {}", e);
        }

        {
            let mut state = self.state.write().await;
            state.baseline = Some(snapshot);
            state.baseline_at = Some(now);
        }

        CycleOutcome {
            data,
            status,
            finished_at: now,
        }
    }

    async fn send_change_notification(&self, diff: &QueueDiff) {
        let notification = Notification::schedule_changed(&self.notifier_config, diff);
        if let Err(e) = self.notifier.notify(&notification).await {
            log::error!("Failed to deliver change notification: {}", e);
        }
    }
}
