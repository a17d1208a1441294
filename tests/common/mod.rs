#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use oracle_models::{Event, League, ManualClock, Odds, OracleError, Result, Teams};
use oracle_services::provider::{Fixture, FixtureTeam, MatchWinnerOdds, Standing};
use oracle_services::SportsDataProvider;

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
}

pub fn scheduled_event(id: &str, home: &str, away: &str) -> Event {
    Event::new(id, "La Liga", Teams::new(home, away), Odds::DEFAULT, 1_700_003_600)
}

pub fn fixture(id: &str, status_code: &str, fulltime: (Option<u32>, Option<u32>)) -> Fixture {
    Fixture {
        id: id.to_string(),
        timestamp: 1_700_003_600,
        status_code: status_code.to_string(),
        home: FixtureTeam {
            id: "529".to_string(),
            name: "Barcelona".to_string(),
        },
        away: FixtureTeam {
            id: "541".to_string(),
            name: "Real Madrid".to_string(),
        },
        goals: fulltime,
        fulltime,
    }
}

/// Provider whose fixtures are set by the test. Unknown fixtures fail.
#[derive(Default)]
pub struct ScriptedProvider {
    fixtures: Mutex<HashMap<String, Fixture>>,
}

impl ScriptedProvider {
    pub fn set(&self, fixture: Fixture) {
        self.fixtures.lock().unwrap().insert(fixture.id.clone(), fixture);
    }

    pub fn remove(&self, fixture_id: &str) {
        self.fixtures.lock().unwrap().remove(fixture_id);
    }
}

#[async_trait]
impl SportsDataProvider for ScriptedProvider {
    async fn upcoming_fixtures(&self, _: &League, _: u32) -> Result<Vec<Fixture>> {
        Ok(self.fixtures.lock().unwrap().values().cloned().collect())
    }

    async fn fixture(&self, fixture_id: &str) -> Result<Fixture> {
        self.fixtures
            .lock()
            .unwrap()
            .get(fixture_id)
            .cloned()
            .ok_or_else(|| OracleError::ProviderHttp {
                status: 503,
                body: format!("fixture {fixture_id} unavailable"),
            })
    }

    async fn match_winner_odds(&self, _: &str) -> Result<Option<MatchWinnerOdds>> {
        Ok(None)
    }

    async fn standings(&self, _: &League) -> Result<Vec<Standing>> {
        Ok(Vec::new())
    }

    async fn recent_fixtures(&self, _: &League, _: &str, _: u32) -> Result<Vec<Fixture>> {
        Ok(Vec::new())
    }
}
