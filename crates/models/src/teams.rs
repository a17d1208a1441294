use serde::{Deserialize, Serialize};

/// Ledger-owned strength record of a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub power: u32,
    pub form: i32,
    pub goal_average: i32,
}

/// A provider league the oracle pulls fixtures and standings from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct League {
    pub id: String,
    pub name: String,
    pub season: String,
}

impl League {
    pub fn new(id: impl Into<String>, name: impl Into<String>, season: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            season: season.into(),
        }
    }
}

/// Weekly betting leaderboard as reported by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Leaderboard {
    pub week: u32,
    pub year: i32,
    pub prize_pool: Option<String>,
    #[serde(default)]
    pub winners: serde_json::Value,
    #[serde(default)]
    pub user_stats: serde_json::Value,
}

impl Leaderboard {
    pub fn is_week(&self, week: u32, year: i32) -> bool {
        self.week == week && self.year == year
    }
}
