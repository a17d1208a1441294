mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use oracle_models::{ManualClock, MatchStatus, Selection};
use oracle_services::{EventMonitor, EventResolver, InMemoryLedger};
use oracle_store::{JobQueue, QueueSettings};

use common::{clock, fixture, scheduled_event, ScriptedProvider};

struct Setup {
    monitor: EventMonitor,
    ledger: Arc<InMemoryLedger>,
    provider: Arc<ScriptedProvider>,
    clock: Arc<ManualClock>,
}

fn setup(path: &Path, clock: Arc<ManualClock>) -> Setup {
    let ledger = Arc::new(InMemoryLedger::with_events(vec![
        scheduled_event("1035037", "Barcelona", "Real Madrid"),
        scheduled_event("1035038", "Atletico Madrid", "Sevilla"),
    ]));
    let provider = Arc::new(ScriptedProvider::default());
    let queue = JobQueue::open(path, QueueSettings::default(), clock.clone());
    let monitor = EventMonitor::new(
        queue,
        provider.clone(),
        ledger.clone(),
        Arc::new(EventResolver::new(ledger.clone(), None)),
        Duration::from_secs(60),
    );
    Setup {
        monitor,
        ledger,
        provider,
        clock,
    }
}

#[tokio::test]
async fn test_jobs_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event-queue.json");
    let clock = clock();

    {
        let s = setup(&path, clock.clone());
        assert!(s.monitor.add_event("1035037", "1035037", "La Liga"));
        assert!(s.monitor.add_event("1035038", "1035038", "La Liga"));
        assert!(!s.monitor.add_event("1035037", "1035037", "La Liga"));
    }

    let s = setup(&path, clock);
    let jobs = s.monitor.jobs();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|job| job.status == MatchStatus::Scheduled));
    assert!(jobs.iter().all(|job| job.poll_interval_secs == 300));
}

#[tokio::test]
async fn test_fixture_followed_from_kickoff_to_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("event-queue.json");
    let s = setup(&path, clock());
    s.monitor.add_event("1035037", "1035037", "La Liga");

    s.provider.set(fixture("1035037", "NS", (None, None)));
    assert_eq!(s.monitor.process_jobs().await, 0);

    s.clock.advance(chrono::Duration::seconds(300));
    s.provider.set(fixture("1035037", "1H", (None, None)));
    assert_eq!(s.monitor.process_jobs().await, 1);
    assert_eq!(s.ledger.event("1035037").unwrap().status, MatchStatus::Live);
    assert_eq!(s.monitor.jobs()[0].poll_interval_secs, 120);

    s.clock.advance(chrono::Duration::seconds(120));
    s.provider.set(fixture("1035037", "FT", (Some(2), Some(1))));
    assert_eq!(s.monitor.process_jobs().await, 1);

    let event = s.ledger.event("1035037").unwrap();
    assert_eq!(event.status, MatchStatus::Finished);
    let result = event.result.unwrap();
    assert_eq!(result.winner, Selection::Home);
    assert_eq!((result.home_score, result.away_score), (2, 1));
    assert_eq!(s.ledger.resolution_count("1035037"), 1);
    assert!(s.monitor.jobs().is_empty());

    let reopened = JobQueue::open(&path, QueueSettings::default(), s.clock.clone());
    assert_eq!(reopened.job_count(), 0);
}

#[tokio::test]
async fn test_unreachable_fixture_evicted_after_retry_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let s = setup(&dir.path().join("event-queue.json"), clock());
    s.monitor.add_event("1035038", "1035038", "La Liga");
    s.clock.advance(chrono::Duration::seconds(300));

    for round in 1..=10 {
        assert_eq!(s.monitor.process_jobs().await, 1);
        assert_eq!(s.monitor.jobs()[0].retry_count, round);
    }

    assert_eq!(s.monitor.process_jobs().await, 0);
    assert!(s.monitor.jobs().is_empty());
    assert_eq!(s.ledger.event("1035038").unwrap().status, MatchStatus::Scheduled);
}
