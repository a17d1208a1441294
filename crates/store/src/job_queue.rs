use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use oracle_models::{Clock, EventQueue, MatchStatus, MonitoringJob};
use tracing::{debug, error, info, warn};

use crate::file_store::JsonFileStore;

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub poll_interval_scheduled: Duration,
    pub poll_interval_live: Duration,
    /// Jobs that reach this many consecutive failures are evicted.
    pub retry_ceiling: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            poll_interval_scheduled: Duration::from_secs(5 * 60),
            poll_interval_live: Duration::from_secs(2 * 60),
            retry_ceiling: 10,
        }
    }
}

/// Work queue of monitoring jobs, one per event, mirrored to disk after
/// every mutation.
///
/// The in-memory queue is authoritative. A failed save is logged and the
/// next successful save catches the file up.
pub struct JobQueue {
    store: JsonFileStore<EventQueue>,
    queue: EventQueue,
    settings: QueueSettings,
    clock: Arc<dyn Clock>,
}

impl JobQueue {
    /// Load the queue from `path`, starting empty if the file is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>, settings: QueueSettings, clock: Arc<dyn Clock>) -> Self {
        let store: JsonFileStore<EventQueue> = JsonFileStore::new(path);
        let queue = match store.load() {
            Ok(Some(queue)) => {
                info!("Loaded {} monitoring jobs from {}", queue.jobs.len(), store.path().display());
                queue
            }
            Ok(None) => EventQueue::empty(clock.now()),
            Err(e) => {
                error!("Error loading queue from {}: {}", store.path().display(), e);
                EventQueue::empty(clock.now())
            }
        };

        Self {
            store,
            queue,
            settings,
            clock,
        }
    }

    /// No-op when the event is already queued.
    pub fn add_job(&mut self, fixture_id: &str, event_id: &str, league: &str) -> bool {
        if self.queue.jobs.iter().any(|job| job.event_id == event_id) {
            debug!("Job for event {} already exists", event_id);
            return false;
        }

        let job = MonitoringJob::new(
            fixture_id,
            event_id,
            league,
            self.clock.now(),
            self.settings.poll_interval_scheduled,
        );
        self.queue.jobs.push(job);
        self.save();
        info!("Added monitoring job for event {} (fixture {})", event_id, fixture_id);
        true
    }

    pub fn remove_job(&mut self, event_id: &str) -> bool {
        let before = self.queue.jobs.len();
        self.queue.jobs.retain(|job| job.event_id != event_id);

        if self.queue.jobs.len() < before {
            self.save();
            info!("Removed monitoring job for event {}", event_id);
            true
        } else {
            false
        }
    }

    /// Record a new status, stamp the check time and retune the poll interval.
    pub fn update_job_status(&mut self, event_id: &str, status: MatchStatus) {
        let now = self.clock.now();
        let poll_interval = match status {
            MatchStatus::Live => Some(self.settings.poll_interval_live),
            MatchStatus::Scheduled => Some(self.settings.poll_interval_scheduled),
            MatchStatus::Finished | MatchStatus::Postponed => None,
        };
        let Some(job) = self.find_mut(event_id) else {
            return;
        };

        job.status = status;
        job.last_checked = now;
        if let Some(interval) = poll_interval {
            job.poll_interval_secs = interval.as_secs();
        }
        self.save();
    }

    /// Stamp a check without changing anything else.
    pub fn mark_checked(&mut self, event_id: &str) {
        let now = self.clock.now();
        if let Some(job) = self.find_mut(event_id) {
            job.last_checked = now;
            self.save();
        }
    }

    pub fn increment_retry(&mut self, event_id: &str) {
        if let Some(job) = self.find_mut(event_id) {
            job.retry_count += 1;
            self.save();
        }
    }

    pub fn reset_retry(&mut self, event_id: &str) {
        if let Some(job) = self.find_mut(event_id) {
            if job.retry_count == 0 {
                return;
            }
            job.retry_count = 0;
            self.save();
        }
    }

    /// Jobs whose poll interval has elapsed, skipping terminal ones.
    ///
    /// Jobs that hit the retry ceiling are evicted as a side effect.
    pub fn jobs_due_for_check(&mut self) -> Vec<MonitoringJob> {
        let ceiling = self.settings.retry_ceiling;
        let exhausted: Vec<String> = self
            .queue
            .jobs
            .iter()
            .filter(|job| job.retry_count >= ceiling)
            .map(|job| job.event_id.clone())
            .collect();

        for event_id in &exhausted {
            warn!("Removing job {} due to max retries ({})", event_id, ceiling);
            self.remove_job(event_id);
        }

        let now = self.clock.now();
        self.queue
            .jobs
            .iter()
            .filter(|job| !job.status.is_terminal() && job.is_due(now))
            .cloned()
            .collect()
    }

    pub fn all_jobs(&self) -> Vec<MonitoringJob> {
        self.queue.jobs.clone()
    }

    pub fn get(&self, event_id: &str) -> Option<&MonitoringJob> {
        self.queue.jobs.iter().find(|job| job.event_id == event_id)
    }

    pub fn job_count(&self) -> usize {
        self.queue.jobs.len()
    }

    pub fn snapshot(&self) -> &EventQueue {
        &self.queue
    }

    fn find_mut(&mut self, event_id: &str) -> Option<&mut MonitoringJob> {
        self.queue.jobs.iter_mut().find(|job| job.event_id == event_id)
    }

    fn save(&mut self) {
        self.queue.last_updated = self.clock.now();
        if let Err(e) = self.store.save(&self.queue) {
            error!("Error saving queue to {}: {}", self.store.path().display(), e);
        }
    }
}
