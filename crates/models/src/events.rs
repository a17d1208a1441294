use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};

/// Lifecycle state of a tracked match.
///
/// Transitions only move forward: `Scheduled -> Live -> Finished`, or
/// `Scheduled | Live -> Postponed`. `Finished` and `Postponed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
}

impl MatchStatus {
    /// Map an api-sports short status code onto the internal lifecycle.
    /// Unknown codes are treated as not started yet.
    pub fn from_provider_code(code: &str) -> Self {
        match code {
            "NS" | "TBD" => Self::Scheduled,
            "1H" | "HT" | "2H" | "ET" | "P" => Self::Live,
            "FT" | "AET" | "PEN" => Self::Finished,
            "PST" | "CANC" | "ABD" => Self::Postponed,
            _ => Self::Scheduled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Postponed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Live | Self::Finished | Self::Postponed)
                | (Self::Live, Self::Finished | Self::Postponed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Live => "Live",
            Self::Finished => "Finished",
            Self::Postponed => "Postponed",
        }
    }

    /// Parse the ledger's status string. Comparison is case-insensitive
    /// because older ledger builds report `SCHEDULED`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "live" => Some(Self::Live),
            "finished" => Some(Self::Finished),
            "postponed" => Some(Self::Postponed),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TypeEvent {
    Football,
    Esports,
    Baseball,
}

impl TypeEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Football => "Football",
            Self::Esports => "Esports",
            Self::Baseball => "Baseball",
        }
    }
}

/// Winning side of a resolved match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Selection {
    Home,
    Away,
    Tie,
}

impl Selection {
    /// Strict comparison; equal scores are a tie.
    pub fn from_score(home_score: u32, away_score: u32) -> Self {
        if home_score > away_score {
            Self::Home
        } else if away_score > home_score {
            Self::Away
        } else {
            Self::Tie
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Away => "Away",
            Self::Tie => "Tie",
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Teams {
    pub home: String,
    pub away: String,
}

impl Teams {
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            away: away.into(),
        }
    }
}

/// Provider team identifiers, used to look teams up in the ledger's power table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamIds {
    pub home: String,
    pub away: String,
}

/// Decimal odds in fixed point (`1.80` is stored as `180`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Odds {
    pub home: u64,
    pub away: u64,
    pub tie: u64,
}

impl Odds {
    /// Used whenever bookmaker odds cannot be fetched.
    pub const DEFAULT: Self = Self {
        home: 105,
        away: 115,
        tie: 110,
    };

    pub fn new(home: u64, away: u64, tie: u64) -> Self {
        Self { home, away, tie }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResult {
    pub winner: Selection,
    pub home_score: u32,
    pub away_score: u32,
}

impl MatchResult {
    pub fn from_score(home_score: u32, away_score: u32) -> Self {
        Self {
            winner: Selection::from_score(home_score, away_score),
            home_score,
            away_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveScore {
    pub home: u32,
    pub away: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchEventType {
    Goal,
    YellowCard,
    RedCard,
    Substitution,
    Corner,
    Penalty,
}

impl MatchEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Goal => "Goal",
            Self::YellowCard => "YellowCard",
            Self::RedCard => "RedCard",
            Self::Substitution => "Substitution",
            Self::Corner => "Corner",
            Self::Penalty => "Penalty",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Goal" => Some(Self::Goal),
            "YellowCard" => Some(Self::YellowCard),
            "RedCard" => Some(Self::RedCard),
            "Substitution" => Some(Self::Substitution),
            "Corner" => Some(Self::Corner),
            "Penalty" => Some(Self::Penalty),
            _ => None,
        }
    }
}

/// A sub-event inside a live match (goal, card, substitution).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEvent {
    pub event_type: MatchEventType,
    /// Match minute the sub-event happened in.
    pub time: u32,
    pub team: String,
    pub player: Option<String>,
    pub detail: Option<String>,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

/// A trackable match as known to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub status: MatchStatus,
    pub type_event: TypeEvent,
    pub league: String,
    pub teams: Teams,
    pub team_ids: Option<TeamIds>,
    pub odds: Odds,
    /// Kick-off, unix seconds.
    pub start_time: i64,
    /// `None` until the match is resolved.
    pub result: Option<MatchResult>,
    pub live_score: Option<LiveScore>,
    pub match_events: Vec<MatchEvent>,
    pub current_minute: Option<u32>,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        league: impl Into<String>,
        teams: Teams,
        odds: Odds,
        start_time: i64,
    ) -> Self {
        Self {
            id: id.into(),
            status: MatchStatus::Scheduled,
            type_event: TypeEvent::Football,
            league: league.into(),
            teams,
            team_ids: None,
            odds,
            start_time,
            result: None,
            live_score: None,
            match_events: Vec::new(),
            current_minute: None,
        }
    }

    pub fn with_status(mut self, status: MatchStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_team_ids(mut self, team_ids: TeamIds) -> Self {
        self.team_ids = Some(team_ids);
        self
    }

    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Move to `next`, rejecting anything but a forward transition.
    pub fn transition(&mut self, next: MatchStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(OracleError::InvalidTransition {
                event_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn set_current_minute(&mut self, minute: u32) -> Result<()> {
        if let Some(current) = self.current_minute {
            if minute < current {
                return Err(OracleError::MinuteRegression {
                    event_id: self.id.clone(),
                    current,
                    requested: minute,
                });
            }
        }
        self.current_minute = Some(minute);
        Ok(())
    }

    pub fn push_match_event(&mut self, event: MatchEvent) {
        self.match_events.push(event);
    }

    /// Record the final outcome and move to `Finished`.
    pub fn resolve(&mut self, result: MatchResult) -> Result<()> {
        self.transition(MatchStatus::Finished)?;
        self.result = Some(result);
        Ok(())
    }

    /// Live score as reported, defaulting to 0-0 for events that never had one.
    pub fn score(&self) -> (u32, u32) {
        self.live_score
            .as_ref()
            .map_or((0, 0), |score| (score.home, score.away))
    }
}
