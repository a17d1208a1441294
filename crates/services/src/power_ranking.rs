use std::sync::Arc;
use std::time::Duration;

use oracle_models::{Event, League, MatchResult, OracleError, Result, Selection, Team};
use tracing::{debug, error, info, warn};

use crate::ledger::LedgerGateway;
use crate::provider::{SportsDataProvider, Standing};

/// Number of recent fixtures the goal-difference bonus looks at.
const RECENT_FIXTURES: u32 = 5;

/// How team strength is recomputed after a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    /// Nudge power and form by the result; used with simulated matches.
    Simulated,
    /// Recompute from the provider's standings and recent fixtures.
    RealData,
}

/// Linear interpolation of `value` from `[in_min, in_max]` onto
/// `[out_min, out_max]`, floored.
fn map_range(value: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    ((value - in_min) * (out_max - out_min)).div_euclid(in_max - in_min) + out_min
}

/// Base power from league position, in bands from 98 (top) down to 50.
pub fn base_power(rank: u32) -> u32 {
    let rank = i64::from(rank);
    let power = match rank {
        ..=4 => map_range(rank, 1, 4, 98, 90),
        5..=7 => map_range(rank, 5, 7, 89, 82),
        8..=14 => map_range(rank, 8, 14, 80, 70),
        15..=17 => map_range(rank, 15, 17, 69, 60),
        _ => map_range(rank, 18, 20, 59, 50),
    };
    u32::try_from(power.max(0)).unwrap_or(0)
}

/// +2 per win and -2 per loss in a form string like `WWDLW`.
pub fn form_points(form: &str) -> i32 {
    form.chars()
        .map(|c| match c {
            'W' => 2,
            'L' => -2,
            _ => 0,
        })
        .sum()
}

pub fn goal_difference_points(goal_difference: i64) -> i32 {
    match goal_difference {
        8.. => 5,
        4..=7 => 3,
        1..=3 => 1,
        0 => 0,
        -3..=-1 => -1,
        -7..=-4 => -3,
        _ => -5,
    }
}

/// Result-driven adjustment: the winner gains 3 power and 2 form, the
/// loser drops by the same, and both carry the score differential into
/// their goal average. Power never goes below zero.
pub fn simulated_update(home: &Team, away: &Team, result: &MatchResult) -> (Team, Team) {
    let (power_delta, form_delta) = match result.winner {
        Selection::Home => (3, 2),
        Selection::Away => (-3, -2),
        Selection::Tie => (0, 0),
    };
    let differential = i64::from(result.home_score) - i64::from(result.away_score);
    let differential = i32::try_from(differential).unwrap_or(0);

    let apply = |team: &Team, power: i64, form: i32, goals: i32| Team {
        power: u32::try_from((i64::from(team.power) + power).max(0)).unwrap_or(0),
        form: team.form + form,
        goal_average: team.goal_average + goals,
        ..team.clone()
    };

    (
        apply(home, power_delta, form_delta, differential),
        apply(away, -power_delta, -form_delta, -differential),
    )
}

/// Maintains the ledger's team power table.
pub struct PowerRankingService {
    ledger: Arc<dyn LedgerGateway>,
    provider: Option<Arc<dyn SportsDataProvider>>,
    leagues: Vec<League>,
    mode: RankingMode,
    update_pause: Duration,
}

impl PowerRankingService {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        provider: Option<Arc<dyn SportsDataProvider>>,
        leagues: Vec<League>,
        mode: RankingMode,
    ) -> Self {
        Self {
            ledger,
            provider,
            leagues,
            mode,
            update_pause: Duration::from_millis(200),
        }
    }

    pub fn with_update_pause(mut self, pause: Duration) -> Self {
        self.update_pause = pause;
        self
    }

    pub fn mode(&self) -> RankingMode {
        self.mode
    }

    /// Recompute both teams of a resolved event. Failures are logged and
    /// never propagate to the caller.
    pub async fn update_after_match(&self, event_id: &str, result: &MatchResult) {
        if let Err(e) = self.try_update_after_match(event_id, result).await {
            error!("Error updating power after match {}: {}", event_id, e);
        }
    }

    async fn try_update_after_match(&self, event_id: &str, result: &MatchResult) -> Result<()> {
        let events = self.ledger.get_events().await?;
        let Some(event) = events.into_iter().find(|event| event.id == event_id) else {
            warn!("Event {} not found for power update", event_id);
            return Ok(());
        };

        let teams = self.ledger.get_teams().await?;
        let (Some(home), Some(away)) = (find_team(&teams, &event, true), find_team(&teams, &event, false)) else {
            warn!(
                "Teams not found for power update: {} vs {}",
                event.teams.home, event.teams.away
            );
            return Ok(());
        };

        let (new_home, new_away) = match self.mode {
            RankingMode::Simulated => simulated_update(home, away, result),
            RankingMode::RealData => {
                let Some(league) = self.leagues.iter().find(|league| league.name == event.league) else {
                    warn!("League '{}' not configured, skipping power update", event.league);
                    return Ok(());
                };
                let provider = self.provider()?;
                let standings = provider.standings(league).await?;
                (
                    self.recompute(provider, league, &standings, home).await?,
                    self.recompute(provider, league, &standings, away).await?,
                )
            }
        };

        info!(
            "{}: power {} -> {}, form {} -> {}, goal average {} -> {}",
            new_home.name, home.power, new_home.power, home.form, new_home.form, home.goal_average, new_home.goal_average
        );
        info!(
            "{}: power {} -> {}, form {} -> {}, goal average {} -> {}",
            new_away.name, away.power, new_away.power, away.form, new_away.form, away.goal_average, new_away.goal_average
        );

        self.ledger.update_team_power(&new_home).await?;
        self.ledger.update_team_power(&new_away).await?;
        Ok(())
    }

    async fn recompute(
        &self,
        provider: &dyn SportsDataProvider,
        league: &League,
        standings: &[Standing],
        current: &Team,
    ) -> Result<Team> {
        let Some(row) = standings.iter().find(|row| row.team.id == current.id) else {
            warn!("Team {} not found in standings", current.id);
            return Ok(current.clone());
        };

        let goal_difference = self.goal_difference(provider, league, &current.id).await?;
        Ok(Team {
            power: base_power(row.rank),
            form: form_points(&row.form),
            goal_average: goal_difference_points(goal_difference),
            ..current.clone()
        })
    }

    async fn goal_difference(&self, provider: &dyn SportsDataProvider, league: &League, team_id: &str) -> Result<i64> {
        let fixtures = provider.recent_fixtures(league, team_id, RECENT_FIXTURES).await?;
        Ok(fixtures
            .iter()
            .filter_map(|fixture| fixture.goal_difference_for(team_id))
            .sum())
    }

    /// Rebuild the power of every team in a league from its standings.
    /// Returns the number of teams written; a single team's failure is
    /// logged and skipped.
    pub async fn refresh_league(&self, league: &League) -> Result<usize> {
        info!("📊 Refreshing power rankings for {} ({})", league.name, league.id);
        let provider = self.provider()?;
        let standings = provider.standings(league).await?;

        let mut updated = 0;
        for row in &standings {
            let team = match self.goal_difference(provider, league, &row.team.id).await {
                Ok(goal_difference) => Team {
                    id: row.team.id.clone(),
                    name: row.team.name.clone(),
                    power: base_power(row.rank),
                    form: form_points(&row.form),
                    goal_average: goal_difference_points(goal_difference),
                },
                Err(e) => {
                    error!("Failed to fetch goal difference for {}: {}", row.team.name, e);
                    continue;
                }
            };

            match self.ledger.update_team_power(&team).await {
                Ok(()) => {
                    debug!("{} ({}) -> power {}", team.name, team.id, team.power);
                    updated += 1;
                }
                Err(e) => error!("Failed to update team {}: {}", team.name, e),
            }

            if !self.update_pause.is_zero() {
                tokio::time::sleep(self.update_pause).await;
            }
        }

        Ok(updated)
    }

    /// Refresh every configured league, logging per-league failures.
    pub async fn refresh_all(&self) {
        for league in &self.leagues {
            if let Err(e) = self.refresh_league(league).await {
                error!("Error refreshing power rankings for {}: {}", league.name, e);
            }
        }
    }

    fn provider(&self) -> Result<&dyn SportsDataProvider> {
        self.provider
            .as_deref()
            .ok_or_else(|| OracleError::Config("power rankings need a sports-data provider".to_string()))
    }
}

/// Ledger team for one side of an event, by provider id when known and by
/// name otherwise.
fn find_team<'a>(teams: &'a [Team], event: &Event, home: bool) -> Option<&'a Team> {
    let name = if home { &event.teams.home } else { &event.teams.away };
    let id = event
        .team_ids
        .as_ref()
        .map(|ids| if home { &ids.home } else { &ids.away });

    id.and_then(|id| teams.iter().find(|team| &team.id == id))
        .or_else(|| teams.iter().find(|team| &team.name == name))
}
