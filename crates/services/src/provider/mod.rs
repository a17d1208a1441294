//! Sports-data provider boundary: fixtures, live status, bookmaker odds
//! and standings.

mod api_sports;

pub use api_sports::{ApiSportsClient, ApiSportsSettings};

use async_trait::async_trait;
use oracle_models::{League, MatchStatus, Result};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureTeam {
    pub id: String,
    pub name: String,
}

/// A fixture as reported by the provider, reduced to the fields the oracle uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub id: String,
    /// Kick-off, unix seconds.
    pub timestamp: i64,
    /// Provider short status code (`NS`, `1H`, `FT`, ...).
    pub status_code: String,
    pub home: FixtureTeam,
    pub away: FixtureTeam,
    pub goals: (Option<u32>, Option<u32>),
    pub fulltime: (Option<u32>, Option<u32>),
}

impl Fixture {
    pub fn status(&self) -> MatchStatus {
        MatchStatus::from_provider_code(&self.status_code)
    }

    /// Final score: full-time when reported, otherwise the running goal
    /// count, missing sides counted as zero.
    pub fn final_score(&self) -> (u32, u32) {
        match self.fulltime {
            (None, None) => (self.goals.0.unwrap_or(0), self.goals.1.unwrap_or(0)),
            (home, away) => (home.unwrap_or(0), away.unwrap_or(0)),
        }
    }

    /// Goals scored minus conceded from the perspective of `team_id`,
    /// `None` when the team did not play this fixture.
    pub fn goal_difference_for(&self, team_id: &str) -> Option<i64> {
        let home = i64::from(self.goals.0.unwrap_or(0));
        let away = i64::from(self.goals.1.unwrap_or(0));
        if self.home.id == team_id {
            Some(home - away)
        } else if self.away.id == team_id {
            Some(away - home)
        } else {
            None
        }
    }
}

/// Raw decimal quotes of a bookmaker's "Match Winner" market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchWinnerOdds {
    pub home: Decimal,
    pub away: Decimal,
    pub draw: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub rank: u32,
    pub team: FixtureTeam,
    /// Recent results, e.g. `WWDLW`.
    pub form: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SportsDataProvider: Send + Sync {
    /// Next `count` fixtures of a league.
    async fn upcoming_fixtures(&self, league: &League, count: u32) -> Result<Vec<Fixture>>;

    async fn fixture(&self, fixture_id: &str) -> Result<Fixture>;

    /// Match-winner quotes from the configured bookmaker, `None` when the
    /// bookmaker or market is not offered for this fixture.
    async fn match_winner_odds(&self, fixture_id: &str) -> Result<Option<MatchWinnerOdds>>;

    async fn standings(&self, league: &League) -> Result<Vec<Standing>>;

    /// The team's last `count` played fixtures in a league.
    async fn recent_fixtures(&self, league: &League, team_id: &str, count: u32) -> Result<Vec<Fixture>>;
}
