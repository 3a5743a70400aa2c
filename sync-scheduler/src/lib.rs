//! Daily sync scheduling. A `SyncScheduler` arms a timer for the next
//! occurrence of the configured wall-clock time, fires the injected sync
//! action once there, then every interval (24 h in production) after that,
//! recording each outcome and answering status queries.

pub mod notify;

pub use notify::Notifier;

use auraxsync_core::{
    CoreError, LastSyncRecord, SyncAction, SyncError, SyncInsights, SyncSettings, SyncStatusReport,
    SyncTrigger, TimeOfDay,
};
use chrono::Local;
use local_store::{DiagnosticLog, LocalStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Not armed; no timer pending.
    Idle,
    /// Timer pending for the next fire.
    Armed,
    /// An automated sync is in flight.
    Running,
}

struct SchedulerState {
    phase: Phase,
    scheduled_time: TimeOfDay,
    timer: Option<JoinHandle<()>>,
}

pub struct SyncScheduler<A> {
    action: Arc<A>,
    store: Arc<LocalStore>,
    diagnostics: Arc<DiagnosticLog>,
    notifier: Notifier,
    sync_interval: Duration,
    state: Arc<Mutex<SchedulerState>>,
    // Single in-flight sync at a time: automated fires queue behind it,
    // manual syncs are rejected while it is held.
    in_flight: Arc<AsyncMutex<()>>,
}

impl<A> Clone for SyncScheduler<A> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
            store: self.store.clone(),
            diagnostics: self.diagnostics.clone(),
            notifier: self.notifier.clone(),
            sync_interval: self.sync_interval,
            state: self.state.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<A: SyncAction> SyncScheduler<A> {
    pub fn new(
        action: Arc<A>,
        store: Arc<LocalStore>,
        diagnostics: Arc<DiagnosticLog>,
        notifier: Notifier,
    ) -> Self {
        Self {
            action,
            store,
            diagnostics,
            notifier,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            state: Arc::new(Mutex::new(SchedulerState {
                phase: Phase::Idle,
                scheduled_time: TimeOfDay::new(9, 0),
                timer: None,
            })),
            in_flight: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Overrides the interval between automated fires (24 h in
    /// production).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Arms the daily sync. Calling this while already armed or running is
    /// a logged no-op; there is never more than one pending timer.
    pub fn start_daily_sync(&self, scheduled_time: TimeOfDay) {
        let mut state = self.state.lock().unwrap();
        if state.phase != Phase::Idle {
            warn!("Sync scheduler is already running");
            return;
        }

        state.scheduled_time = scheduled_time;
        let initial_delay = scheduled_time.delay_until_next(Local::now().naive_local());

        let this = self.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            this.spawn_sync_run();

            let mut ticker = tokio::time::interval(this.sync_interval);
            // The first tick completes immediately; the initial fire above
            // already consumed that slot.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.spawn_sync_run();
            }
        }));
        state.phase = Phase::Armed;
        drop(state);

        self.diagnostics.record(
            "SCHEDULER_STARTED",
            serde_json::json!({
                "scheduled_time": scheduled_time.to_string(),
                "initial_delay_secs": initial_delay.as_secs(),
                "interval_secs": self.sync_interval.as_secs(),
            }),
        );
        info!("Daily sync scheduled for {} local time", scheduled_time);
    }

    /// Disarms the scheduler. Idempotent. A sync already in flight runs to
    /// completion and still writes its record; only future fires are
    /// cancelled.
    pub fn stop_daily_sync(&self) {
        let mut state = self.state.lock().unwrap();
        if state.phase == Phase::Idle {
            return;
        }

        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.phase = Phase::Idle;
        drop(state);

        self.diagnostics
            .record("SCHEDULER_STOPPED", serde_json::json!({}));
        info!("Daily sync scheduler stopped");
    }

    // Each fire runs in its own task so aborting the timer loop never
    // cancels an in-flight sync.
    fn spawn_sync_run(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            this.perform_scheduled_sync().await;
        });
    }

    /// One automated sync cycle. Every failure of the action is caught
    /// here and recorded; nothing may unwind into the timer loop, which
    /// would silently stop all future fires.
    async fn perform_scheduled_sync(&self) {
        let _guard = self.in_flight.lock().await;
        self.set_phase_running();

        self.diagnostics.record(
            "SCHEDULED_SYNC_INITIATED",
            serde_json::json!({ "trigger": "automated" }),
        );

        match self.action.run_sync().await {
            Ok(insights) => {
                self.diagnostics.record(
                    "SCHEDULED_SYNC_SUCCESS",
                    serde_json::json!({
                        "total_impressions": insights.metrics.total_impressions,
                        "total_reach": insights.metrics.total_reach,
                        "avg_engagement_rate": insights.metrics.avg_engagement_rate,
                    }),
                );
                self.write_record(LastSyncRecord::success(SyncTrigger::Automated));

                if self.notifications_enabled() {
                    self.notifier.notify(
                        "Aurax Instagram Sync",
                        "Instagram insights synced successfully!",
                    );
                }
            }
            Err(e) => {
                error!("Scheduled sync failed: {}", e);
                self.diagnostics.record(
                    "SCHEDULED_SYNC_ERROR",
                    serde_json::json!({ "error": e.to_string() }),
                );
                self.write_record(LastSyncRecord::error(SyncTrigger::Automated, e.to_string()));
            }
        }

        // Re-arm unless the scheduler was stopped while we ran.
        let mut state = self.state.lock().unwrap();
        if state.phase == Phase::Running {
            state.phase = Phase::Armed;
        }
    }

    /// Runs the sync action immediately, bypassing the timer, and returns
    /// the result for display. Does not touch the armed/idle state.
    /// Rejected when a sync is already in flight.
    pub async fn perform_manual_sync(&self) -> Result<SyncInsights, CoreError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Manual sync rejected: a sync is already in progress");
            return Err(SyncError::SyncInProgress.into());
        };

        self.diagnostics.record(
            "MANUAL_SYNC_INITIATED",
            serde_json::json!({ "trigger": "manual" }),
        );

        let result = self.action.run_sync().await;
        let record = match &result {
            Ok(_) => LastSyncRecord::success(SyncTrigger::Manual),
            Err(e) => LastSyncRecord::error(SyncTrigger::Manual, e.to_string()),
        };
        self.store.save_last_sync(&record)?;

        result
    }

    pub fn get_sync_status(&self) -> SyncStatusReport {
        let state = self.state.lock().unwrap();
        let is_running = state.phase != Phase::Idle;
        let next_sync_estimate = is_running.then(|| {
            state
                .scheduled_time
                .next_occurrence(Local::now().naive_local())
        });

        let last_sync = self.store.last_sync().unwrap_or_else(|e| {
            warn!("Failed to read last sync record: {}", e);
            None
        });

        SyncStatusReport {
            is_running,
            scheduled_time: state.scheduled_time,
            last_sync,
            next_sync_estimate,
        }
    }

    /// Moves the daily fire to a new time. When armed, the old timer is
    /// fully stopped before the new one is armed so at no point are two
    /// timers pending; when idle, only the stored preference changes.
    pub fn update_schedule_time(&self, new_time: TimeOfDay) {
        let was_running = {
            let state = self.state.lock().unwrap();
            state.phase != Phase::Idle
        };

        if was_running {
            self.stop_daily_sync();
            self.start_daily_sync(new_time);
        } else {
            self.state.lock().unwrap().scheduled_time = new_time;
        }

        self.diagnostics.record(
            "SCHEDULER_TIME_UPDATED",
            serde_json::json!({ "scheduled_time": new_time.to_string() }),
        );
    }

    /// Persists the settings and arms or disarms accordingly.
    pub fn save_settings(&self, settings: &SyncSettings) -> Result<(), CoreError> {
        self.store.save_sync_settings(settings)?;

        if settings.auto_sync_enabled {
            self.start_daily_sync(settings.scheduled_time);
        } else {
            self.stop_daily_sync();
        }
        Ok(())
    }

    /// Re-arms from persisted settings. This is the only path by which the
    /// schedule survives a process restart.
    pub fn initialize(&self) -> Result<(), CoreError> {
        let Some(settings) = self.store.sync_settings()? else {
            info!("No saved sync settings; scheduler stays idle");
            return Ok(());
        };

        self.state.lock().unwrap().scheduled_time = settings.scheduled_time;
        if settings.auto_sync_enabled {
            self.start_daily_sync(settings.scheduled_time);
        }
        Ok(())
    }

    fn set_phase_running(&self) {
        let mut state = self.state.lock().unwrap();
        if state.phase == Phase::Armed {
            state.phase = Phase::Running;
        }
    }

    fn notifications_enabled(&self) -> bool {
        self.store
            .sync_settings()
            .ok()
            .flatten()
            .map(|s| s.notifications_enabled)
            .unwrap_or(false)
    }

    fn write_record(&self, record: LastSyncRecord) {
        if let Err(e) = self.store.save_last_sync(&record) {
            error!("Failed to persist last sync record: {}", e);
        }
    }
}
