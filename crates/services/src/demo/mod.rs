//! Demo mode: schedules registered events to kick off after a short random
//! delay and simulates each live match minute by minute.

mod fixtures;
mod generator;

pub use fixtures::demo_events;
pub use generator::{EventProbabilities, MatchEventGenerator};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use oracle_models::{Clock, DemoEvent, Event, MatchSimulation, MatchStatus, Result, Teams};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ingest::EventRegistrar;
use crate::ledger::LedgerGateway;
use crate::resolution::EventResolver;

#[derive(Debug, Clone)]
pub struct DemoSettings {
    /// Simultaneous live matches. Events past their deadline wait for a slot.
    pub max_live_events: usize,
    pub detection_tick: Duration,
    /// Wall-clock length of one simulated minute.
    pub minute_tick: Duration,
    pub start_delay_min: Duration,
    pub start_delay_max: Duration,
    pub defer_min: Duration,
    pub defer_max: Duration,
    /// Live matches running longer than this are force-finished.
    pub max_live_duration: Duration,
    pub full_time_minute: u32,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            max_live_events: 3,
            detection_tick: Duration::from_secs(30),
            minute_tick: Duration::from_secs(60),
            start_delay_min: Duration::from_secs(30),
            start_delay_max: Duration::from_secs(5 * 60),
            defer_min: Duration::from_secs(60),
            defer_max: Duration::from_secs(2 * 60),
            max_live_duration: Duration::from_secs(2 * 60 * 60),
            full_time_minute: 90,
        }
    }
}

/// Result of one simulated minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    FullTime,
    /// The match is no longer tracked; the ticker should exit.
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoStatus {
    pub running: bool,
    pub scheduled: usize,
    pub live: usize,
    pub simulations: Vec<MatchSimulation>,
}

struct LiveMatch {
    simulation: MatchSimulation,
    cancel: CancellationToken,
}

#[derive(Default)]
struct EngineState {
    events: HashMap<String, DemoEvent>,
    live: HashMap<String, LiveMatch>,
}

impl EngineState {
    fn is_tracked(&self, event_id: &str) -> bool {
        self.events.contains_key(event_id) || self.live.contains_key(event_id)
    }
}

/// Owns every demo event and live simulation. Whoever removes a match
/// from the live map resolves it, so each match resolves exactly once.
pub struct DemoEngine {
    ledger: Arc<dyn LedgerGateway>,
    resolver: Arc<EventResolver>,
    clock: Arc<dyn Clock>,
    settings: DemoSettings,
    generator: MatchEventGenerator,
    state: Mutex<EngineState>,
    rng: Mutex<StdRng>,
    running: AtomicBool,
    shutdown: CancellationToken,
}

impl DemoEngine {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        resolver: Arc<EventResolver>,
        clock: Arc<dyn Clock>,
        settings: DemoSettings,
    ) -> Self {
        Self {
            ledger,
            resolver,
            clock,
            settings,
            generator: MatchEventGenerator::default(),
            state: Mutex::new(EngineState::default()),
            rng: Mutex::new(StdRng::from_entropy()),
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_generator(mut self, generator: MatchEventGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn settings(&self) -> &DemoSettings {
        &self.settings
    }

    /// Register an event with a random kickoff delay.
    pub fn add_event(&self, event_id: &str, fixture_id: &str, teams: Teams) -> bool {
        let delay = self.random_between(self.settings.start_delay_min, self.settings.start_delay_max);
        self.add_event_with_delay(event_id, fixture_id, teams, delay)
    }

    pub fn add_event_with_delay(&self, event_id: &str, fixture_id: &str, teams: Teams, delay: Duration) -> bool {
        let mut state = self.state.lock();
        if state.is_tracked(event_id) {
            debug!("Demo event {} already tracked", event_id);
            return false;
        }

        let event = DemoEvent::new(event_id, fixture_id, teams, self.clock.now(), delay);
        info!(
            "🎮 Added event {} to demo engine, kickoff in {}s",
            event_id,
            delay.as_secs()
        );
        state.events.insert(event_id.to_string(), event);
        true
    }

    /// Register every scheduled ledger event not tracked yet.
    pub async fn load_existing_events(&self) -> Result<usize> {
        let events = self.ledger.get_events().await?;
        let mut added = 0;
        for event in events.iter().filter(|event| event.status == MatchStatus::Scheduled) {
            if self.add_event(&event.id, &event.id, event.teams.clone()) {
                added += 1;
            }
        }

        if added > 0 {
            info!("🎮 Loaded {} scheduled events from ledger", added);
        }
        Ok(added)
    }

    /// Rebuild simulations for matches the ledger reports live, continuing
    /// from the ledger's minute and score. Matches already at full time are
    /// resolved instead.
    pub async fn resume_live_events(self: &Arc<Self>) -> Result<usize> {
        let events = self.ledger.get_events().await?;
        let now = self.clock.now();
        let mut resumed = 0;

        for event in events.into_iter().filter(Event::is_live) {
            let simulation = MatchSimulation::resume(&event, now);

            if simulation.match_minute >= self.settings.full_time_minute {
                if self.state.lock().is_tracked(&event.id) {
                    continue;
                }
                info!(
                    "Event {} was left at minute {}, resolving",
                    event.id, simulation.match_minute
                );
                if let Err(e) = self.resolver.resolve(&event.id, simulation.result()).await {
                    error!("Error resolving stale live event {}: {}", event.id, e);
                }
                continue;
            }

            let token = {
                let mut state = self.state.lock();
                if state.is_tracked(&event.id) {
                    continue;
                }

                let mut demo_event = DemoEvent::new(&event.id, &event.id, event.teams.clone(), now, Duration::ZERO);
                demo_event.status = MatchStatus::Live;
                demo_event.live_at = Some(now);
                state.events.insert(event.id.clone(), demo_event);

                let cancel = self.shutdown.child_token();
                state.live.insert(
                    event.id.clone(),
                    LiveMatch {
                        simulation,
                        cancel: cancel.clone(),
                    },
                );
                cancel
            };

            info!(
                "🔄 Resumed event {} at minute {} ({}-{})",
                event.id,
                event.current_minute.unwrap_or(0),
                event.score().0,
                event.score().1
            );
            self.spawn_ticker(event.id.clone(), token);
            resumed += 1;
        }

        Ok(resumed)
    }

    /// One detection tick: enforce the live-duration ceiling, then move
    /// every event past its kickoff deadline to live, capacity permitting.
    pub async fn process_events(self: &Arc<Self>) {
        self.check_safety_timeouts().await;

        let now = self.clock.now();
        let mut ready: Vec<(DateTime<Utc>, String)> = self
            .state
            .lock()
            .events
            .values()
            .filter(|event| event.is_ready(now))
            .map(|event| (event.kickoff_deadline(), event.event_id.clone()))
            .collect();
        ready.sort();

        for (_, event_id) in ready {
            if let Err(e) = self.go_live(&event_id).await {
                error!("🎮 Error starting demo event {}: {}", event_id, e);
            }
        }
    }

    /// Move a scheduled event to live and start its ticker. When the live
    /// cap is reached the kickoff is deferred instead; returns whether the
    /// event went live.
    pub async fn go_live(self: &Arc<Self>, event_id: &str) -> Result<bool> {
        let token = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let live_count = state.live.len();
            let Some(event) = state.events.get_mut(event_id) else {
                return Ok(false);
            };
            if event.status != MatchStatus::Scheduled {
                return Ok(false);
            }

            if live_count >= self.settings.max_live_events {
                let delay = self.random_between(self.settings.defer_min, self.settings.defer_max);
                event.defer(delay);
                info!(
                    "Live cap of {} reached, deferring event {} by {}s",
                    self.settings.max_live_events,
                    event_id,
                    delay.as_secs()
                );
                return Ok(false);
            }

            let now = self.clock.now();
            event.status = MatchStatus::Live;
            event.live_at = Some(now);

            let cancel = self.shutdown.child_token();
            state.live.insert(
                event_id.to_string(),
                LiveMatch {
                    simulation: MatchSimulation::new(event_id, event.teams.clone(), now),
                    cancel: cancel.clone(),
                },
            );
            cancel
        };

        if let Err(e) = self.ledger.update_event_status(event_id, MatchStatus::Live).await {
            let delay = self.random_between(self.settings.defer_min, self.settings.defer_max);
            let mut state = self.state.lock();
            state.live.remove(event_id);
            if let Some(event) = state.events.get_mut(event_id) {
                event.status = MatchStatus::Scheduled;
                event.live_at = None;
                event.defer(delay);
            }
            return Err(e);
        }

        info!("⚽ Event {} transitioning: scheduled -> live", event_id);
        self.spawn_ticker(event_id.to_string(), token);
        Ok(true)
    }

    /// Simulate one minute of a live match and push it to the ledger.
    pub async fn advance_minute(&self, event_id: &str) -> Result<TickOutcome> {
        let timestamp = self.clock.now().timestamp_millis();
        let (minute, sub_event, home, away) = {
            let mut state = self.state.lock();
            let Some(live) = state.live.get_mut(event_id) else {
                return Ok(TickOutcome::Stopped);
            };
            let simulation = &mut live.simulation;
            simulation.match_minute += 1;

            let sub_event = self.generator.roll(
                &mut *self.rng.lock(),
                simulation.match_minute,
                &simulation.teams,
                timestamp,
            );
            if let Some(sub_event) = &sub_event {
                simulation.record(sub_event.clone());
            }
            (
                simulation.match_minute,
                sub_event,
                simulation.home_score,
                simulation.away_score,
            )
        };

        self.ledger.update_current_minute(event_id, minute).await?;
        if let Some(sub_event) = &sub_event {
            info!(
                "{}' {} for {} in event {}",
                minute,
                sub_event.event_type.as_str(),
                sub_event.team,
                event_id
            );
            self.ledger.add_match_event(event_id, sub_event).await?;
        }
        self.ledger.update_event_live_score(event_id, home, away).await?;

        if minute >= self.settings.full_time_minute {
            self.finish(event_id).await;
            return Ok(TickOutcome::FullTime);
        }
        Ok(TickOutcome::Continue)
    }

    /// Stop a live match and resolve it with its current score. Returns
    /// `false` when the match was already finished elsewhere.
    pub async fn finish(&self, event_id: &str) -> bool {
        let live = {
            let mut state = self.state.lock();
            let Some(live) = state.live.remove(event_id) else {
                return false;
            };
            state.events.remove(event_id);
            live
        };
        live.cancel.cancel();

        let result = live.simulation.result();
        info!(
            "Event {} transitioning: live -> finished at minute {}",
            event_id, live.simulation.match_minute
        );
        if let Err(e) = self.resolver.resolve(event_id, result).await {
            error!("Error resolving demo event {}: {}", event_id, e);
        }
        true
    }

    /// Force-finish live matches that ran past the wall-clock ceiling.
    pub async fn check_safety_timeouts(&self) -> usize {
        let now = self.clock.now();
        let ceiling = self.settings.max_live_duration;
        let expired: Vec<String> = self
            .state
            .lock()
            .live
            .values()
            .filter(|live| {
                now.signed_duration_since(live.simulation.started_at)
                    .to_std()
                    .is_ok_and(|elapsed| elapsed > ceiling)
            })
            .map(|live| live.simulation.event_id.clone())
            .collect();

        let mut finished = 0;
        for event_id in expired {
            warn!("Event {} exceeded the live duration ceiling, force-finishing", event_id);
            if self.finish(&event_id).await {
                finished += 1;
            }
        }
        finished
    }

    fn spawn_ticker(self: &Arc<Self>, event_id: String, cancel: CancellationToken) {
        let engine = Arc::clone(self);
        let period = self.settings.minute_tick;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => match engine.advance_minute(&event_id).await {
                        Ok(TickOutcome::Continue) => {}
                        Ok(TickOutcome::FullTime | TickOutcome::Stopped) => break,
                        Err(e) => {
                            error!("Error simulating minute for event {}: {}", event_id, e);
                            engine.finish(&event_id).await;
                            break;
                        }
                    },
                }
            }
            debug!("Ticker for event {} stopped", event_id);
        });
    }

    /// Run detection ticks until [`stop`](Self::stop) is called.
    pub async fn run(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("🎮 Demo engine already running");
            return;
        }
        info!("🎮 Demo engine started");

        let period = self.settings.detection_tick;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.process_events().await,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("🎮 Demo engine stopped");
    }

    /// Stop the detection loop and every match ticker.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn status(&self) -> DemoStatus {
        let state = self.state.lock();
        let mut simulations: Vec<MatchSimulation> =
            state.live.values().map(|live| live.simulation.clone()).collect();
        simulations.sort_by(|a, b| a.event_id.cmp(&b.event_id));

        DemoStatus {
            running: self.running.load(Ordering::SeqCst),
            scheduled: state
                .events
                .values()
                .filter(|event| event.status == MatchStatus::Scheduled)
                .count(),
            live: state.live.len(),
            simulations,
        }
    }

    pub fn simulation(&self, event_id: &str) -> Option<MatchSimulation> {
        self.state.lock().live.get(event_id).map(|live| live.simulation.clone())
    }

    pub fn demo_event(&self, event_id: &str) -> Option<DemoEvent> {
        self.state.lock().events.get(event_id).cloned()
    }

    fn random_between(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        Duration::from_secs(self.rng.lock().gen_range(min.as_secs()..=max.as_secs()))
    }
}

impl EventRegistrar for DemoEngine {
    fn register(&self, event: &Event) {
        self.add_event(&event.id, &event.id, event.teams.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, LedgerCall};
    use chrono::TimeZone;
    use oracle_models::{LiveScore, ManualClock, MatchEventType, Odds};

    struct Harness {
        engine: Arc<DemoEngine>,
        ledger: Arc<InMemoryLedger>,
        clock: Arc<ManualClock>,
    }

    fn scheduled(id: &str) -> Event {
        Event::new(id, "La Liga", Teams::new("Barcelona", "Real Madrid"), Odds::DEFAULT, 0)
    }

    fn harness(events: Vec<Event>, generator: MatchEventGenerator) -> Harness {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let ledger = Arc::new(InMemoryLedger::with_events(events));
        let resolver = Arc::new(EventResolver::new(ledger.clone(), None));
        let engine = Arc::new(
            DemoEngine::new(ledger.clone(), resolver, clock.clone(), DemoSettings::default())
                .with_seed(42)
                .with_generator(generator),
        );
        Harness { engine, ledger, clock }
    }

    fn silent() -> MatchEventGenerator {
        MatchEventGenerator::new(EventProbabilities {
            goal: 0.0,
            yellow_card: 0.0,
            red_card: 0.0,
            substitution: 0.0,
            ..EventProbabilities::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_waits_for_start_delay() {
        let h = harness(vec![scheduled("e1")], silent());
        h.engine
            .add_event_with_delay("e1", "e1", Teams::new("Barcelona", "Real Madrid"), Duration::from_secs(60));

        h.engine.process_events().await;
        assert!(h.engine.simulation("e1").is_none());

        h.clock.advance(chrono::Duration::seconds(60));
        h.engine.process_events().await;
        let simulation = h.engine.simulation("e1").unwrap();
        assert_eq!(simulation.match_minute, 0);
        assert_eq!(h.ledger.status_history("e1"), vec![MatchStatus::Live]);
        h.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_start_delay_within_bounds() {
        let h = harness(Vec::new(), silent());
        for n in 0..20 {
            h.engine.add_event(&format!("e{n}"), "f", Teams::new("A", "B"));
            let delay = h.engine.demo_event(&format!("e{n}")).unwrap().start_delay_secs;
            assert!((30..=300).contains(&delay));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_registration_ignored() {
        let h = harness(Vec::new(), silent());
        assert!(h.engine.add_event_with_delay("e1", "e1", Teams::new("A", "B"), Duration::ZERO));
        assert!(!h.engine.add_event_with_delay("e1", "e1", Teams::new("A", "B"), Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_cap_defers_instead_of_dropping() {
        let events: Vec<Event> = (1..=4).map(|n| scheduled(&format!("e{n}"))).collect();
        let h = harness(events, silent());
        for n in 1..=4 {
            h.engine
                .add_event_with_delay(&format!("e{n}"), "f", Teams::new("A", "B"), Duration::ZERO);
        }

        h.engine.process_events().await;

        let status = h.engine.status();
        assert_eq!(status.live, 3);
        assert_eq!(status.scheduled, 1);

        let deferred = h.engine.demo_event("e4").unwrap();
        assert_eq!(deferred.status, MatchStatus::Scheduled);
        assert!((60..=120).contains(&deferred.start_delay_secs));
        h.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_minute_pushes_minute_and_score() {
        let h = harness(vec![scheduled("e1")], silent());
        h.engine.add_event_with_delay("e1", "e1", Teams::new("Barcelona", "Real Madrid"), Duration::ZERO);
        h.engine.process_events().await;

        assert_eq!(h.engine.advance_minute("e1").await.unwrap(), TickOutcome::Continue);

        let calls = h.ledger.calls();
        assert!(calls.contains(&LedgerCall::UpdateMinute("e1".to_string(), 1)));
        assert!(calls.contains(&LedgerCall::UpdateLiveScore("e1".to_string(), 0, 0)));
        h.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_time_resolves_once_with_accumulated_score() {
        let generator = MatchEventGenerator::new(EventProbabilities {
            goal: 1.0,
            ..EventProbabilities::default()
        });
        let h = harness(vec![scheduled("e1")], generator);
        h.engine.add_event_with_delay("e1", "e1", Teams::new("Barcelona", "Real Madrid"), Duration::ZERO);
        h.engine.process_events().await;

        let mut outcome = TickOutcome::Continue;
        while outcome == TickOutcome::Continue {
            outcome = h.engine.advance_minute("e1").await.unwrap();
        }
        assert_eq!(outcome, TickOutcome::FullTime);
        assert_eq!(h.engine.advance_minute("e1").await.unwrap(), TickOutcome::Stopped);
        assert!(!h.engine.finish("e1").await);

        let event = h.ledger.event("e1").unwrap();
        let result = event.result.unwrap();
        assert_eq!(result.home_score + result.away_score, 90);
        assert_eq!(event.match_events.len(), 90);
        assert!(event
            .match_events
            .iter()
            .all(|sub_event| sub_event.event_type == MatchEventType::Goal));
        assert_eq!(h.ledger.resolution_count("e1"), 1);
        assert!(h.engine.demo_event("e1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_safety_timeout_force_finishes() {
        let h = harness(vec![scheduled("e1")], silent());
        h.engine.add_event_with_delay("e1", "e1", Teams::new("Barcelona", "Real Madrid"), Duration::ZERO);
        h.engine.process_events().await;

        h.clock.advance(chrono::Duration::hours(2));
        assert_eq!(h.engine.check_safety_timeouts().await, 0);

        h.clock.advance(chrono::Duration::seconds(1));
        assert_eq!(h.engine.check_safety_timeouts().await, 1);
        assert!(h.engine.simulation("e1").is_none());
        assert_eq!(h.ledger.event("e1").unwrap().result.unwrap().winner, oracle_models::Selection::Tie);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_continues_from_ledger_minute() {
        let mut live = scheduled("e1").with_status(MatchStatus::Live);
        live.current_minute = Some(50);
        live.live_score = Some(LiveScore {
            home: 3,
            away: 1,
            updated_at: None,
        });
        let h = harness(vec![live], silent());

        assert_eq!(h.engine.resume_live_events().await.unwrap(), 1);
        h.engine.advance_minute("e1").await.unwrap();

        let event = h.ledger.event("e1").unwrap();
        assert_eq!(event.current_minute, Some(51));
        assert_eq!(event.score(), (3, 1));
        h.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_resolves_matches_past_full_time() {
        let mut live = scheduled("e1").with_status(MatchStatus::Live);
        live.current_minute = Some(90);
        live.live_score = Some(LiveScore {
            home: 0,
            away: 2,
            updated_at: None,
        });
        let h = harness(vec![live], silent());

        assert_eq!(h.engine.resume_live_events().await.unwrap(), 0);
        let event = h.ledger.event("e1").unwrap();
        assert_eq!(event.status, MatchStatus::Finished);
        assert_eq!(event.result.unwrap().winner, oracle_models::Selection::Away);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_existing_events_registers_scheduled_only() {
        let h = harness(
            vec![
                scheduled("a"),
                scheduled("b").with_status(MatchStatus::Finished),
                scheduled("c"),
            ],
            silent(),
        );

        assert_eq!(h.engine.load_existing_events().await.unwrap(), 2);
        assert_eq!(h.engine.load_existing_events().await.unwrap(), 0);
        assert_eq!(h.engine.status().scheduled, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_error_force_finishes_match() {
        let h = harness(vec![scheduled("e1")], silent());
        h.engine.add_event_with_delay("e1", "e1", Teams::new("Barcelona", "Real Madrid"), Duration::ZERO);
        h.engine.process_events().await;

        // Minute regression on the ledger makes the next push fail.
        h.ledger.update_current_minute("e1", 30).await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(h.engine.simulation("e1").is_none());
        assert_eq!(h.ledger.resolution_count("e1"), 1);
    }
}
