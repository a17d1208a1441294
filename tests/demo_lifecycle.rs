mod common;

use std::sync::Arc;
use std::time::Duration;

use oracle_models::{LiveScore, MatchStatus, Selection, Teams};
use oracle_services::{DemoEngine, DemoSettings, EventResolver, InMemoryLedger};

use common::{clock, scheduled_event};

fn engine(ledger: Arc<InMemoryLedger>, settings: DemoSettings) -> Arc<DemoEngine> {
    let resolver = Arc::new(EventResolver::new(ledger.clone(), None));
    Arc::new(DemoEngine::new(ledger, resolver, clock(), settings).with_seed(7))
}

#[tokio::test(start_paused = true)]
async fn test_demo_match_runs_to_full_time_and_resolves_once() {
    let ledger = Arc::new(InMemoryLedger::with_events(vec![scheduled_event(
        "demo_1",
        "Barcelona",
        "Real Madrid",
    )]));
    let engine = engine(ledger.clone(), DemoSettings::default());

    engine.add_event_with_delay("demo_1", "demo_1", Teams::new("Barcelona", "Real Madrid"), Duration::ZERO);
    engine.process_events().await;

    let simulation = engine.simulation("demo_1").unwrap();
    assert_eq!(simulation.match_minute, 0);
    assert_eq!(ledger.event("demo_1").unwrap().status, MatchStatus::Live);

    tokio::time::sleep(Duration::from_secs(91 * 60)).await;

    let event = ledger.event("demo_1").unwrap();
    assert_eq!(event.status, MatchStatus::Finished);
    assert_eq!(event.current_minute, Some(90));
    assert_eq!(ledger.resolution_count("demo_1"), 1);

    let result = event.result.unwrap();
    assert_eq!(event.score(), (result.home_score, result.away_score));
    assert_eq!(result.winner, Selection::from_score(result.home_score, result.away_score));

    let goals = event
        .match_events
        .iter()
        .filter(|sub_event| sub_event.event_type == oracle_models::MatchEventType::Goal)
        .count();
    assert_eq!(goals as u32, result.home_score + result.away_score);
    assert!(engine.simulation("demo_1").is_none());

    engine.stop();
}

#[tokio::test(start_paused = true)]
async fn test_live_cap_holds_back_extra_matches() {
    let ids: Vec<String> = (1..=5).map(|n| format!("demo_{n}")).collect();
    let ledger = Arc::new(InMemoryLedger::with_events(
        ids.iter().map(|id| scheduled_event(id, "PSG", "Marseille")).collect(),
    ));
    let engine = engine(ledger.clone(), DemoSettings::default());
    for id in &ids {
        engine.add_event_with_delay(id, id, Teams::new("PSG", "Marseille"), Duration::ZERO);
    }

    engine.process_events().await;
    let status = engine.status();
    assert_eq!(status.live, 3);
    assert_eq!(status.scheduled, 2);

    let live_on_ledger = ids
        .iter()
        .filter(|id| ledger.event(id).unwrap().status == MatchStatus::Live)
        .count();
    assert_eq!(live_on_ledger, 3);

    engine.stop();
}

#[tokio::test(start_paused = true)]
async fn test_restart_resumes_live_match_from_ledger() {
    let mut live = scheduled_event("demo_9", "Juventus", "Inter Milan").with_status(MatchStatus::Live);
    live.current_minute = Some(50);
    live.live_score = Some(LiveScore {
        home: 3,
        away: 1,
        updated_at: None,
    });
    let ledger = Arc::new(InMemoryLedger::with_events(vec![live]));
    let engine = engine(ledger.clone(), DemoSettings::default());

    assert_eq!(engine.resume_live_events().await.unwrap(), 1);
    let simulation = engine.simulation("demo_9").unwrap();
    assert_eq!(simulation.match_minute, 50);
    assert_eq!((simulation.home_score, simulation.away_score), (3, 1));

    tokio::time::sleep(Duration::from_secs(41 * 60)).await;

    let event = ledger.event("demo_9").unwrap();
    assert_eq!(event.status, MatchStatus::Finished);
    assert_eq!(ledger.resolution_count("demo_9"), 1);
    let result = event.result.unwrap();
    assert!(result.home_score >= 3);
    assert!(result.away_score >= 1);

    engine.stop();
}
