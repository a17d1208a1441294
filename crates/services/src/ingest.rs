use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use oracle_models::{Clock, Event, League, MatchStatus, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{error, info, warn};

use crate::demo::demo_events;
use crate::ledger::LedgerGateway;
use crate::provider::{Fixture, SportsDataProvider};
use crate::transformer::transform_fixture;

/// Receives newly created events so an engine can start tracking them.
pub trait EventRegistrar: Send + Sync {
    fn register(&self, event: &Event);
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Target size of the scheduled backlog on the ledger.
    pub max_scheduled_events: usize,
    pub fixtures_per_league: u32,
    /// Pause between per-league provider requests.
    pub league_pause: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_scheduled_events: 10,
            fixtures_per_league: 36,
            league_pause: Duration::from_secs(1),
        }
    }
}

/// Tops the ledger's scheduled backlog up to its target from upcoming
/// provider fixtures, or from the demo catalogue when no provider is set.
pub struct FixtureIngestor {
    ledger: Arc<dyn LedgerGateway>,
    provider: Option<Arc<dyn SportsDataProvider>>,
    registrar: Arc<dyn EventRegistrar>,
    clock: Arc<dyn Clock>,
    leagues: Vec<League>,
    settings: IngestSettings,
    rng: Mutex<StdRng>,
}

impl FixtureIngestor {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        provider: Option<Arc<dyn SportsDataProvider>>,
        registrar: Arc<dyn EventRegistrar>,
        clock: Arc<dyn Clock>,
        leagues: Vec<League>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            ledger,
            provider,
            registrar,
            clock,
            leagues,
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Create as many new events as the backlog needs. Returns the events
    /// actually created on the ledger.
    pub async fn run_once(&self) -> Result<Vec<Event>> {
        let existing = match self.ledger.get_events().await {
            Ok(events) => events,
            Err(e) => {
                error!("Error checking existing events: {}", e);
                Vec::new()
            }
        };

        let scheduled = existing
            .iter()
            .filter(|event| event.status == MatchStatus::Scheduled)
            .count();
        let needed = self.settings.max_scheduled_events.saturating_sub(scheduled);
        if needed == 0 {
            info!(
                "Already have {} scheduled events (max: {})",
                scheduled, self.settings.max_scheduled_events
            );
            return Ok(Vec::new());
        }
        info!("Need {} more events to reach {}", needed, self.settings.max_scheduled_events);

        let existing_ids: HashSet<&str> = existing.iter().map(|event| event.id.as_str()).collect();
        let candidates = match &self.provider {
            Some(provider) => {
                self.provider_candidates(provider.as_ref(), &existing_ids, needed)
                    .await
            }
            None => demo_events(self.clock.now())
                .into_iter()
                .filter(|event| !existing_ids.contains(event.id.as_str()))
                .take(needed)
                .collect(),
        };

        let mut created = Vec::with_capacity(candidates.len());
        for event in candidates {
            match self.ledger.create_event(&event).await {
                Ok(()) => {
                    info!("✅ Created event {}: {} vs {}", event.id, event.teams.home, event.teams.away);
                    self.registrar.register(&event);
                    created.push(event);
                }
                Err(e) => error!("Failed to create event {}: {}", event.id, e),
            }
        }

        info!("Finished creating {} events", created.len());
        Ok(created)
    }

    async fn provider_candidates(
        &self,
        provider: &dyn SportsDataProvider,
        existing_ids: &HashSet<&str>,
        needed: usize,
    ) -> Vec<Event> {
        let mut fixtures: Vec<(Fixture, String)> = Vec::new();
        for (index, league) in self.leagues.iter().enumerate() {
            if index > 0 && !self.settings.league_pause.is_zero() {
                tokio::time::sleep(self.settings.league_pause).await;
            }

            match provider
                .upcoming_fixtures(league, self.settings.fixtures_per_league)
                .await
            {
                Ok(found) if found.is_empty() => info!("No fixtures found for {}", league.name),
                Ok(found) => {
                    info!("Found {} fixtures for {}", found.len(), league.name);
                    fixtures.extend(found.into_iter().map(|fixture| (fixture, league.name.clone())));
                }
                Err(e) => warn!("Error fetching fixtures for {}: {}", league.name, e),
            }
        }

        fixtures.shuffle(&mut *self.rng.lock());
        let selected: Vec<(Fixture, String)> = fixtures
            .into_iter()
            .filter(|(fixture, _)| !existing_ids.contains(fixture.id.as_str()))
            .take(needed)
            .collect();
        info!("Selected {} fixtures", selected.len());

        let mut events = Vec::with_capacity(selected.len());
        for (fixture, league) in &selected {
            events.push(transform_fixture(provider, fixture, league).await);
        }
        events
    }
}
