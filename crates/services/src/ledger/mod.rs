//! Typed gateway to the ledger application that owns the authoritative
//! event records, team power table and weekly leaderboard.

mod graphql;
mod memory;

pub use graphql::GraphqlLedger;
pub use memory::{InMemoryLedger, LedgerCall};

use async_trait::async_trait;
use oracle_models::{Event, Leaderboard, MatchEvent, MatchResult, MatchStatus, Odds, Result, Team};

/// Every mutation the oracle is allowed to perform on the ledger, plus the
/// read queries it needs to rebuild state after a restart.
///
/// Implementations must surface transport failures, non-2xx responses and
/// GraphQL error payloads as `Err`. Nothing is silently swallowed here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn create_event(&self, event: &Event) -> Result<()>;

    async fn update_event_status(&self, event_id: &str, status: MatchStatus) -> Result<()>;

    async fn update_event_odds(&self, event_id: &str, odds: Odds) -> Result<()>;

    async fn update_event_live_score(&self, event_id: &str, home: u32, away: u32) -> Result<()>;

    async fn update_current_minute(&self, event_id: &str, minute: u32) -> Result<()>;

    async fn add_match_event(&self, event_id: &str, event: &MatchEvent) -> Result<()>;

    async fn resolve_event(&self, event_id: &str, result: &MatchResult) -> Result<()>;

    async fn update_team_power(&self, team: &Team) -> Result<()>;

    async fn get_events(&self) -> Result<Vec<Event>>;

    async fn get_teams(&self) -> Result<Vec<Team>>;

    async fn start_new_week(&self, week: u32, year: i32, prize_pool: &str) -> Result<()>;

    async fn end_current_week(&self, week: u32, year: i32) -> Result<()>;

    /// Current leaderboard, `None` when no week has been started yet.
    async fn leaderboard(&self) -> Result<Option<Leaderboard>>;

    /// Subscribe this chain to the main chain's event feed.
    async fn subscribe(&self, chain_id: &str) -> Result<()>;
}
