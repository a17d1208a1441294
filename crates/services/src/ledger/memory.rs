use async_trait::async_trait;
use chrono::Utc;
use oracle_models::{
    Event, Leaderboard, LiveScore, MatchEvent, MatchResult, MatchStatus, Odds, OracleError, Result, Team,
};
use parking_lot::Mutex;
use serde_json::Value;

use super::LedgerGateway;

/// One mutation as received by the in-memory ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    CreateEvent(String),
    UpdateStatus(String, MatchStatus),
    UpdateOdds(String, Odds),
    UpdateLiveScore(String, u32, u32),
    UpdateMinute(String, u32),
    AddMatchEvent(String, MatchEvent),
    Resolve(String, MatchResult),
    UpdateTeamPower(Team),
    StartWeek(u32, i32),
    EndWeek(u32, i32),
    Subscribe(String),
}

#[derive(Default)]
struct LedgerState {
    events: Vec<Event>,
    teams: Vec<Team>,
    leaderboard: Option<Leaderboard>,
    calls: Vec<LedgerCall>,
}

impl LedgerState {
    fn event_mut(&mut self, event_id: &str) -> Result<&mut Event> {
        self.events
            .iter_mut()
            .find(|event| event.id == event_id)
            .ok_or_else(|| OracleError::EventNotFound {
                event_id: event_id.to_string(),
            })
    }
}

/// Ledger kept in process memory.
///
/// Applies the same rules the real ledger application enforces: unique
/// event ids, forward-only status, non-decreasing minute and a single
/// resolution per event. Used for local runs without a ledger service and
/// as the ledger double in tests.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        let ledger = Self::new();
        ledger.state.lock().events = events;
        ledger
    }

    pub fn insert_event(&self, event: Event) {
        self.state.lock().events.push(event);
    }

    pub fn insert_team(&self, team: Team) {
        let mut state = self.state.lock();
        state.teams.retain(|existing| existing.id != team.id);
        state.teams.push(team);
    }

    pub fn set_leaderboard(&self, leaderboard: Option<Leaderboard>) {
        self.state.lock().leaderboard = leaderboard;
    }

    pub fn event(&self, event_id: &str) -> Option<Event> {
        self.state.lock().events.iter().find(|event| event.id == event_id).cloned()
    }

    pub fn team(&self, team_id: &str) -> Option<Team> {
        self.state.lock().teams.iter().find(|team| team.id == team_id).cloned()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state.lock().calls.clone()
    }

    pub fn resolution_count(&self, event_id: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, LedgerCall::Resolve(id, _) if id == event_id))
            .count()
    }

    /// Status pushes received for one event, in order.
    pub fn status_history(&self, event_id: &str) -> Vec<MatchStatus> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                LedgerCall::UpdateStatus(id, status) if id == event_id => Some(*status),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn create_event(&self, event: &Event) -> Result<()> {
        let mut state = self.state.lock();
        if state.events.iter().any(|existing| existing.id == event.id) {
            return Err(OracleError::Ledger(format!("Event {} already exists", event.id)));
        }
        state.events.push(event.clone());
        state.calls.push(LedgerCall::CreateEvent(event.id.clone()));
        Ok(())
    }

    async fn update_event_status(&self, event_id: &str, status: MatchStatus) -> Result<()> {
        let mut state = self.state.lock();
        let event = state.event_mut(event_id)?;
        if event.status != status {
            event.transition(status)?;
        }
        state.calls.push(LedgerCall::UpdateStatus(event_id.to_string(), status));
        Ok(())
    }

    async fn update_event_odds(&self, event_id: &str, odds: Odds) -> Result<()> {
        let mut state = self.state.lock();
        state.event_mut(event_id)?.odds = odds;
        state.calls.push(LedgerCall::UpdateOdds(event_id.to_string(), odds));
        Ok(())
    }

    async fn update_event_live_score(&self, event_id: &str, home: u32, away: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.event_mut(event_id)?.live_score = Some(LiveScore {
            home,
            away,
            updated_at: Some(Utc::now()),
        });
        state
            .calls
            .push(LedgerCall::UpdateLiveScore(event_id.to_string(), home, away));
        Ok(())
    }

    async fn update_current_minute(&self, event_id: &str, minute: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.event_mut(event_id)?.set_current_minute(minute)?;
        state.calls.push(LedgerCall::UpdateMinute(event_id.to_string(), minute));
        Ok(())
    }

    async fn add_match_event(&self, event_id: &str, event: &MatchEvent) -> Result<()> {
        let mut state = self.state.lock();
        state.event_mut(event_id)?.push_match_event(event.clone());
        state
            .calls
            .push(LedgerCall::AddMatchEvent(event_id.to_string(), event.clone()));
        Ok(())
    }

    async fn resolve_event(&self, event_id: &str, result: &MatchResult) -> Result<()> {
        let mut state = self.state.lock();
        let event = state.event_mut(event_id)?;
        if event.result.is_some() {
            return Err(OracleError::Ledger(format!("Event {event_id} is already resolved")));
        }
        if event.status == MatchStatus::Finished {
            event.result = Some(*result);
        } else {
            event.resolve(*result)?;
        }
        state.calls.push(LedgerCall::Resolve(event_id.to_string(), *result));
        Ok(())
    }

    async fn update_team_power(&self, team: &Team) -> Result<()> {
        let mut state = self.state.lock();
        state.teams.retain(|existing| existing.id != team.id);
        state.teams.push(team.clone());
        state.calls.push(LedgerCall::UpdateTeamPower(team.clone()));
        Ok(())
    }

    async fn get_events(&self) -> Result<Vec<Event>> {
        Ok(self.state.lock().events.clone())
    }

    async fn get_teams(&self) -> Result<Vec<Team>> {
        Ok(self.state.lock().teams.clone())
    }

    async fn start_new_week(&self, week: u32, year: i32, prize_pool: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.leaderboard = Some(Leaderboard {
            week,
            year,
            prize_pool: Some(prize_pool.to_string()),
            winners: Value::Null,
            user_stats: Value::Null,
        });
        state.calls.push(LedgerCall::StartWeek(week, year));
        Ok(())
    }

    async fn end_current_week(&self, week: u32, year: i32) -> Result<()> {
        let mut state = self.state.lock();
        match &state.leaderboard {
            Some(board) if board.is_week(week, year) => {}
            _ => {
                return Err(OracleError::Ledger(format!(
                    "Week {week}/{year} is not the current leaderboard week"
                )))
            }
        }
        state.calls.push(LedgerCall::EndWeek(week, year));
        Ok(())
    }

    async fn leaderboard(&self) -> Result<Option<Leaderboard>> {
        Ok(self.state.lock().leaderboard.clone())
    }

    async fn subscribe(&self, chain_id: &str) -> Result<()> {
        self.state.lock().calls.push(LedgerCall::Subscribe(chain_id.to_string()));
        Ok(())
    }
}
