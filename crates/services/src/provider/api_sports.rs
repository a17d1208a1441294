use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use oracle_models::{League, OracleError, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Fixture, FixtureTeam, MatchWinnerOdds, SportsDataProvider, Standing};

/// api-sports bet id of the 1X2 market.
const MATCH_WINNER_BET_ID: u64 = 1;

#[derive(Debug, Clone)]
pub struct ApiSportsSettings {
    pub base_url: String,
    pub api_key: String,
    pub host: String,
    pub bookmaker_id: u64,
    pub timeout: Duration,
}

impl Default for ApiSportsSettings {
    fn default() -> Self {
        Self {
            base_url: "https://v3.football.api-sports.io".to_string(),
            api_key: String::new(),
            host: "v3.football.api-sports.io".to_string(),
            bookmaker_id: 8, // Bet365
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    errors: Value,
    response: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    fixture: RawFixtureInfo,
    teams: RawTeams,
    #[serde(default)]
    goals: RawScore,
    #[serde(default)]
    score: RawScoreBreakdown,
}

#[derive(Debug, Deserialize)]
struct RawFixtureInfo {
    id: u64,
    timestamp: i64,
    status: RawStatus,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    short: String,
}

#[derive(Debug, Deserialize)]
struct RawTeams {
    home: RawTeam,
    away: RawTeam,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: u64,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawScore {
    home: Option<u32>,
    away: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawScoreBreakdown {
    #[serde(default)]
    fulltime: RawScore,
}

#[derive(Debug, Deserialize)]
struct RawOddsEntry {
    #[serde(default)]
    bookmakers: Vec<RawBookmaker>,
}

#[derive(Debug, Deserialize)]
struct RawBookmaker {
    id: u64,
    #[serde(default)]
    bets: Vec<RawBet>,
}

#[derive(Debug, Deserialize)]
struct RawBet {
    id: u64,
    #[serde(default)]
    values: Vec<RawBetValue>,
}

#[derive(Debug, Deserialize)]
struct RawBetValue {
    value: String,
    odd: String,
}

#[derive(Debug, Deserialize)]
struct RawStandingsEntry {
    league: RawStandingsLeague,
}

#[derive(Debug, Deserialize)]
struct RawStandingsLeague {
    standings: Vec<Vec<RawStanding>>,
}

#[derive(Debug, Deserialize)]
struct RawStanding {
    rank: u32,
    team: RawTeam,
    form: Option<String>,
}

impl From<RawTeam> for FixtureTeam {
    fn from(team: RawTeam) -> Self {
        Self {
            id: team.id.to_string(),
            name: team.name,
        }
    }
}

impl From<RawFixture> for Fixture {
    fn from(raw: RawFixture) -> Self {
        Self {
            id: raw.fixture.id.to_string(),
            timestamp: raw.fixture.timestamp,
            status_code: raw.fixture.status.short,
            home: raw.teams.home.into(),
            away: raw.teams.away.into(),
            goals: (raw.goals.home, raw.goals.away),
            fulltime: (raw.score.fulltime.home, raw.score.fulltime.away),
        }
    }
}

fn parse_odd(value: &RawBetValue) -> Result<Decimal> {
    Decimal::from_str(value.odd.trim()).map_err(|_| OracleError::InvalidField {
        field: "odds.value",
        value: value.odd.clone(),
    })
}

fn match_winner(entry: &RawOddsEntry, bookmaker_id: u64) -> Result<Option<MatchWinnerOdds>> {
    let Some(bet) = entry
        .bookmakers
        .iter()
        .find(|bookmaker| bookmaker.id == bookmaker_id)
        .and_then(|bookmaker| bookmaker.bets.iter().find(|bet| bet.id == MATCH_WINNER_BET_ID))
    else {
        return Ok(None);
    };

    let quote = |label: &str| bet.values.iter().find(|value| value.value == label);
    match (quote("Home"), quote("Away"), quote("Draw")) {
        (Some(home), Some(away), Some(draw)) => Ok(Some(MatchWinnerOdds {
            home: parse_odd(home)?,
            away: parse_odd(away)?,
            draw: parse_odd(draw)?,
        })),
        _ => Ok(None),
    }
}

fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

/// HTTP client for the api-sports football v3 API.
pub struct ApiSportsClient {
    client: Client,
    settings: ApiSportsSettings,
}

impl ApiSportsClient {
    pub fn new(settings: ApiSportsSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        Ok(Self { client, settings })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path);
        debug!("Provider GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("x-apisports-key", &self.settings.api_key)
            .header("x-rapidapi-host", &self.settings.host)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(e.to_string())
                } else {
                    OracleError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::ProviderHttp {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| OracleError::Provider(format!("{path}: malformed response: {e}")))?;

        if has_errors(&envelope.errors) {
            return Err(OracleError::Provider(format!("{path}: {}", envelope.errors)));
        }

        Ok(envelope.response)
    }
}

#[async_trait]
impl SportsDataProvider for ApiSportsClient {
    async fn upcoming_fixtures(&self, league: &League, count: u32) -> Result<Vec<Fixture>> {
        let fixtures: Vec<RawFixture> = self
            .get(
                "fixtures",
                &[
                    ("league", league.id.clone()),
                    ("season", league.season.clone()),
                    ("next", count.to_string()),
                ],
            )
            .await?;
        Ok(fixtures.into_iter().map(Fixture::from).collect())
    }

    async fn fixture(&self, fixture_id: &str) -> Result<Fixture> {
        let fixtures: Vec<RawFixture> = self.get("fixtures", &[("id", fixture_id.to_string())]).await?;
        fixtures
            .into_iter()
            .next()
            .map(Fixture::from)
            .ok_or(OracleError::MissingField("response[0].fixture"))
    }

    async fn match_winner_odds(&self, fixture_id: &str) -> Result<Option<MatchWinnerOdds>> {
        let entries: Vec<RawOddsEntry> = self
            .get(
                "odds",
                &[
                    ("fixture", fixture_id.to_string()),
                    ("bookmaker", self.settings.bookmaker_id.to_string()),
                ],
            )
            .await?;

        match entries.first() {
            Some(entry) => match_winner(entry, self.settings.bookmaker_id),
            None => Ok(None),
        }
    }

    async fn standings(&self, league: &League) -> Result<Vec<Standing>> {
        let entries: Vec<RawStandingsEntry> = self
            .get(
                "standings",
                &[("league", league.id.clone()), ("season", league.season.clone())],
            )
            .await?;

        let table = entries
            .into_iter()
            .next()
            .and_then(|entry| entry.league.standings.into_iter().next())
            .ok_or(OracleError::MissingField("response[0].league.standings[0]"))?;

        Ok(table
            .into_iter()
            .map(|row| Standing {
                rank: row.rank,
                team: row.team.into(),
                form: row.form.unwrap_or_default(),
            })
            .collect())
    }

    async fn recent_fixtures(&self, league: &League, team_id: &str, count: u32) -> Result<Vec<Fixture>> {
        let fixtures: Vec<RawFixture> = self
            .get(
                "fixtures",
                &[
                    ("league", league.id.clone()),
                    ("season", league.season.clone()),
                    ("team", team_id.to_string()),
                    ("last", count.to_string()),
                ],
            )
            .await?;
        Ok(fixtures.into_iter().map(Fixture::from).collect())
    }
}
