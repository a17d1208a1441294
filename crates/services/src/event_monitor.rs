use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use oracle_models::{Event, MatchResult, MatchStatus, MonitoringJob, Result};
use oracle_store::JobQueue;
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ingest::EventRegistrar;
use crate::ledger::LedgerGateway;
use crate::odds::fetch_odds;
use crate::provider::SportsDataProvider;
use crate::resolution::EventResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub running: bool,
    pub job_count: usize,
}

/// Real-data driver: polls the provider for every queued job on its own
/// interval and relays status changes, live odds and final results.
pub struct EventMonitor {
    queue: Mutex<JobQueue>,
    provider: Arc<dyn SportsDataProvider>,
    ledger: Arc<dyn LedgerGateway>,
    resolver: Arc<EventResolver>,
    tick: Duration,
    running: AtomicBool,
    shutdown: CancellationToken,
}

impl EventMonitor {
    pub fn new(
        queue: JobQueue,
        provider: Arc<dyn SportsDataProvider>,
        ledger: Arc<dyn LedgerGateway>,
        resolver: Arc<EventResolver>,
        tick: Duration,
    ) -> Self {
        Self {
            queue: Mutex::new(queue),
            provider,
            ledger,
            resolver,
            tick,
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn add_event(&self, fixture_id: &str, event_id: &str, league: &str) -> bool {
        self.queue.lock().add_job(fixture_id, event_id, league)
    }

    /// Check every job that is due. Jobs are handled one after another; a
    /// failure counts against that job only.
    pub async fn process_jobs(&self) -> usize {
        let jobs = self.queue.lock().jobs_due_for_check();
        if jobs.is_empty() {
            return 0;
        }

        info!("Processing {} monitoring jobs", jobs.len());
        for job in &jobs {
            match self.check_fixture_status(job).await {
                Ok(()) => self.queue.lock().reset_retry(&job.event_id),
                Err(e) => {
                    error!("Error checking fixture {}: {}", job.fixture_id, e);
                    self.queue.lock().increment_retry(&job.event_id);
                }
            }
        }
        jobs.len()
    }

    async fn check_fixture_status(&self, job: &MonitoringJob) -> Result<()> {
        let fixture = self.provider.fixture(&job.fixture_id).await?;
        let new_status = fixture.status();

        let mut current = job.status;
        if new_status == job.status {
            self.queue.lock().mark_checked(&job.event_id);
        } else if !job.status.can_transition_to(new_status) {
            warn!(
                "Ignoring backwards status for event {}: {} -> {}",
                job.event_id, job.status, new_status
            );
            self.queue.lock().mark_checked(&job.event_id);
        } else {
            info!("Status changed for event {}: {} -> {}", job.event_id, job.status, new_status);
            self.ledger.update_event_status(&job.event_id, new_status).await?;

            if new_status == MatchStatus::Finished {
                let (home, away) = fixture.final_score();
                self.resolver
                    .resolve(&job.event_id, MatchResult::from_score(home, away))
                    .await?;
                self.queue.lock().remove_job(&job.event_id);
                return Ok(());
            }

            self.queue.lock().update_job_status(&job.event_id, new_status);
            current = new_status;
        }

        if current == MatchStatus::Live {
            self.refresh_live_odds(job).await;
        }
        Ok(())
    }

    async fn refresh_live_odds(&self, job: &MonitoringJob) {
        let Some(odds) = fetch_odds(self.provider.as_ref(), &job.fixture_id).await else {
            return;
        };
        match self.ledger.update_event_odds(&job.event_id, odds).await {
            Ok(()) => debug!("Updated live odds for event {}", job.event_id),
            Err(e) => error!("Error updating odds for {}: {}", job.event_id, e),
        }
    }

    /// Tick until [`stop`](Self::stop) is called.
    pub async fn run(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Event monitor already running");
            return;
        }
        info!("🔍 Event monitor started with {} jobs", self.queue.lock().job_count());

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.process_jobs().await;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Event monitor stopped");
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            running: self.running.load(Ordering::SeqCst),
            job_count: self.queue.lock().job_count(),
        }
    }

    pub fn jobs(&self) -> Vec<MonitoringJob> {
        self.queue.lock().all_jobs()
    }
}

impl EventRegistrar for EventMonitor {
    fn register(&self, event: &Event) {
        if self.add_event(&event.id, &event.id, &event.league) {
            debug!("Added event {} to monitor", event.id);
        }
    }
}
