use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use oracle_services::{DemoEngine, FixtureIngestor, LeaderboardManager, PowerRankingService, RankingMode};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const LEADERBOARD_CHECK: Duration = Duration::from_secs(60 * 60);
const RANKING_REFRESH: Duration = Duration::from_secs(24 * 60 * 60);

/// Periodic background work around the engines: topping up the event
/// backlog, weekly leaderboard rollover and daily power-ranking refresh.
pub struct Scheduler {
    ingestor: Arc<FixtureIngestor>,
    ingest_interval: Duration,
    demo: Option<Arc<DemoEngine>>,
    leaderboard: Option<Arc<LeaderboardManager>>,
    rankings: Option<Arc<PowerRankingService>>,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(ingestor: Arc<FixtureIngestor>, ingest_interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            ingestor,
            ingest_interval,
            demo: None,
            leaderboard: None,
            rankings: None,
            shutdown,
        }
    }

    pub fn with_demo(mut self, demo: Arc<DemoEngine>) -> Self {
        self.demo = Some(demo);
        self
    }

    pub fn with_leaderboard(mut self, leaderboard: Arc<LeaderboardManager>) -> Self {
        self.leaderboard = Some(leaderboard);
        self
    }

    pub fn with_rankings(mut self, rankings: Arc<PowerRankingService>) -> Self {
        self.rankings = Some(rankings);
        self
    }

    /// Start every periodic task. Each runs once immediately.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let ingestor = self.ingestor.clone();
        let demo = self.demo.clone();
        handles.push(every(self.ingest_interval, self.shutdown.clone(), move || {
            let ingestor = ingestor.clone();
            let demo = demo.clone();
            async move { ingest(&ingestor, demo.as_deref()).await }
        }));

        if let Some(leaderboard) = self.leaderboard {
            handles.push(every(LEADERBOARD_CHECK, self.shutdown.clone(), move || {
                let leaderboard = leaderboard.clone();
                async move {
                    if let Err(e) = leaderboard.rollover().await {
                        error!("Leaderboard rollover failed: {}", e);
                    }
                }
            }));
        }

        if let Some(rankings) = self.rankings.filter(|r| r.mode() == RankingMode::RealData) {
            handles.push(every(RANKING_REFRESH, self.shutdown.clone(), move || {
                let rankings = rankings.clone();
                async move { rankings.refresh_all().await }
            }));
        }

        handles
    }
}

async fn ingest(ingestor: &FixtureIngestor, demo: Option<&DemoEngine>) {
    match ingestor.run_once().await {
        Ok(created) if !created.is_empty() => info!("⚽ Ingested {} new events", created.len()),
        Ok(_) => {}
        Err(e) => error!("Fixture ingestion failed: {}", e),
    }

    if let Some(demo) = demo {
        if let Err(e) = demo.load_existing_events().await {
            error!("Failed to load scheduled events into demo engine: {}", e);
        }
    }
}

/// Run `task` now and then every `period` until `shutdown` is cancelled.
fn every<F, Fut>(period: Duration, shutdown: CancellationToken, task: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now(), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => task().await,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use oracle_models::{Event, ManualClock};
    use oracle_services::{EventRegistrar, IngestSettings, InMemoryLedger, LedgerGateway};

    struct Discard;

    impl EventRegistrar for Discard {
        fn register(&self, _: &Event) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_run_on_start() {
        let ledger = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let ingestor = Arc::new(FixtureIngestor::new(
            ledger.clone(),
            None,
            Arc::new(Discard),
            clock.clone(),
            Vec::new(),
            IngestSettings {
                max_scheduled_events: 2,
                ..IngestSettings::default()
            },
        ));
        let leaderboard = Arc::new(LeaderboardManager::new(ledger.clone(), clock, "500"));

        let shutdown = CancellationToken::new();
        let handles = Scheduler::new(ingestor, Duration::from_secs(600), shutdown.clone())
            .with_leaderboard(leaderboard)
            .spawn();
        assert_eq!(handles.len(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ledger.get_events().await.unwrap().len(), 2);
        assert!(ledger.leaderboard().await.unwrap().is_some());

        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
