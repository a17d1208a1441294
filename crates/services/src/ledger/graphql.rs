use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oracle_models::{
    Event, Leaderboard, LiveScore, MatchEvent, MatchEventType, MatchResult, MatchStatus, Odds,
    OracleError, Result, Selection, Team, Teams, TypeEvent,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::LedgerGateway;

const CREATE_EVENT: &str = r"
    mutation CreateEvent(
        $id: String!, $typeEvent: String!, $league: String!, $home: String!, $away: String!,
        $homeOdds: Int!, $awayOdds: Int!, $tieOdds: Int!, $startTime: String!
    ) {
        createEvent(
            id: $id, typeEvent: $typeEvent, league: $league, home: $home, away: $away,
            homeOdds: $homeOdds, awayOdds: $awayOdds, tieOdds: $tieOdds, startTime: $startTime
        )
    }";

const UPDATE_EVENT_STATUS: &str = r"
    mutation UpdateEventStatus($eventId: String!, $status: String!) {
        updateEventStatus(eventId: $eventId, status: $status)
    }";

const UPDATE_EVENT_ODDS: &str = r"
    mutation UpdateEventOdds($eventId: String!, $homeOdds: Int!, $awayOdds: Int!, $tieOdds: Int!) {
        updateEventOdds(eventId: $eventId, homeOdds: $homeOdds, awayOdds: $awayOdds, tieOdds: $tieOdds)
    }";

const UPDATE_EVENT_LIVE_SCORE: &str = r"
    mutation UpdateEventLiveScore($eventId: String!, $homeScore: String!, $awayScore: String!) {
        updateEventLiveScore(eventId: $eventId, homeScore: $homeScore, awayScore: $awayScore)
    }";

const UPDATE_CURRENT_MINUTE: &str = r"
    mutation UpdateCurrentMinute($eventId: String!, $currentMinute: Int!) {
        updateCurrentMinute(eventId: $eventId, currentMinute: $currentMinute)
    }";

const ADD_MATCH_EVENT: &str = r"
    mutation AddMatchEvent(
        $eventId: String!, $eventType: String!, $time: String!, $team: String!,
        $player: String, $detail: String, $timestamp: String!
    ) {
        addMatchEvent(
            eventId: $eventId, eventType: $eventType, time: $time, team: $team,
            player: $player, detail: $detail, timestamp: $timestamp
        )
    }";

const RESOLVE_EVENT: &str = r"
    mutation ResolveEvent($eventId: String!, $winner: String!, $homeScore: String!, $awayScore: String!) {
        resolveEvent(eventId: $eventId, winner: $winner, homeScore: $homeScore, awayScore: $awayScore)
    }";

const UPDATE_TEAM_POWER: &str = r"
    mutation UpdateTeamPower($teamId: String!, $name: String!, $power: Int!, $form: Int!, $goalAverage: Int!) {
        updateTeamPower(teamId: $teamId, name: $name, power: $power, form: $form, goalAverage: $goalAverage)
    }";

const START_NEW_WEEK: &str = r"
    mutation StartNewWeek($week: Int!, $year: Int!, $prizePool: Amount!) {
        startNewWeek(week: $week, year: $year, prizePool: $prizePool)
    }";

const END_CURRENT_WEEK: &str = r"
    mutation EndCurrentWeek($week: Int!, $year: Int!) {
        endCurrentWeek(week: $week, year: $year)
    }";

const SUBSCRIBE: &str = r"
    mutation Subscribe($chainId: ChainId!) {
        subscribe(chainId: $chainId)
    }";

const EVENTS_QUERY: &str = r"
    query {
        events {
            id status typeEvent league
            teams { home away }
            odds { home away tie }
            startTime
            result { winner homeScore awayScore }
            liveScore { home away updatedAt }
            matchEvents { eventType time team player detail timestamp }
            currentMinute
        }
    }";

const TEAMS_QUERY: &str = r"
    query {
        teams { id name power form goalAverage }
    }";

const LEADERBOARD_QUERY: &str = r"
    query {
        leaderboard { week year prizePool }
    }";

/// GraphQL response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

/// Ledger scalars arrive either as JSON numbers or as decimal strings
/// depending on the field, so both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    fn as_i64(&self, field: &'static str) -> Result<i64> {
        match self {
            Self::Int(value) => Ok(*value),
            Self::Text(text) => text.trim().parse().map_err(|_| OracleError::InvalidField {
                field,
                value: text.clone(),
            }),
        }
    }

    fn as_u32(&self, field: &'static str) -> Result<u32> {
        let value = self.as_i64(field)?;
        u32::try_from(value).map_err(|_| OracleError::InvalidField {
            field,
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct EventsData {
    events: Vec<GqlEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlEvent {
    id: String,
    status: String,
    type_event: Option<String>,
    league: String,
    teams: Teams,
    odds: Odds,
    start_time: Scalar,
    result: Option<GqlResult>,
    live_score: Option<GqlLiveScore>,
    #[serde(default)]
    match_events: Option<Vec<GqlMatchEvent>>,
    current_minute: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlResult {
    winner: String,
    home_score: Scalar,
    away_score: Scalar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlLiveScore {
    home: Scalar,
    away: Scalar,
    updated_at: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlMatchEvent {
    event_type: String,
    time: Scalar,
    team: String,
    player: Option<String>,
    detail: Option<String>,
    timestamp: Scalar,
}

#[derive(Debug, Deserialize)]
struct TeamsData {
    teams: Vec<GqlTeam>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlTeam {
    id: String,
    name: String,
    power: u32,
    form: i32,
    goal_average: i32,
}

#[derive(Debug, Deserialize)]
struct LeaderboardData {
    leaderboard: Option<GqlLeaderboard>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlLeaderboard {
    week: u32,
    year: i32,
    prize_pool: Option<Value>,
}

fn parse_winner(value: &str) -> Result<Selection> {
    match value.to_ascii_lowercase().as_str() {
        "home" => Ok(Selection::Home),
        "away" => Ok(Selection::Away),
        "tie" | "draw" => Ok(Selection::Tie),
        _ => Err(OracleError::InvalidField {
            field: "winner",
            value: value.to_string(),
        }),
    }
}

fn parse_type_event(value: Option<&str>) -> TypeEvent {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("esports") => TypeEvent::Esports,
        Some("baseball") => TypeEvent::Baseball,
        _ => TypeEvent::Football,
    }
}

impl TryFrom<GqlEvent> for Event {
    type Error = OracleError;

    fn try_from(raw: GqlEvent) -> Result<Self> {
        let status = MatchStatus::parse(&raw.status).ok_or_else(|| OracleError::InvalidField {
            field: "status",
            value: raw.status.clone(),
        })?;

        // The ledger keeps a placeholder result on unresolved events.
        let result = match (status, raw.result) {
            (MatchStatus::Finished, Some(result)) => Some(MatchResult {
                winner: parse_winner(&result.winner)?,
                home_score: result.home_score.as_u32("result.homeScore")?,
                away_score: result.away_score.as_u32("result.awayScore")?,
            }),
            _ => None,
        };

        let live_score = raw
            .live_score
            .map(|score| -> Result<LiveScore> {
                Ok(LiveScore {
                    home: score.home.as_u32("liveScore.home")?,
                    away: score.away.as_u32("liveScore.away")?,
                    updated_at: score
                        .updated_at
                        .and_then(|at| at.as_i64("liveScore.updatedAt").ok())
                        .and_then(DateTime::<Utc>::from_timestamp_micros),
                })
            })
            .transpose()?;

        let match_events = raw
            .match_events
            .unwrap_or_default()
            .into_iter()
            .map(|event| -> Result<MatchEvent> {
                Ok(MatchEvent {
                    event_type: MatchEventType::parse(&event.event_type).ok_or_else(|| {
                        OracleError::InvalidField {
                            field: "matchEvents.eventType",
                            value: event.event_type.clone(),
                        }
                    })?,
                    time: event.time.as_u32("matchEvents.time")?,
                    team: event.team,
                    player: event.player,
                    detail: event.detail,
                    timestamp: event.timestamp.as_i64("matchEvents.timestamp")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: raw.id,
            status,
            type_event: parse_type_event(raw.type_event.as_deref()),
            league: raw.league,
            teams: raw.teams,
            team_ids: None,
            odds: raw.odds,
            start_time: raw.start_time.as_i64("startTime")?,
            result,
            live_score,
            match_events,
            current_minute: raw.current_minute,
        })
    }
}

fn transport_error(e: &reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout(e.to_string())
    } else {
        OracleError::Transport(e.to_string())
    }
}

/// Ledger gateway speaking GraphQL to the application's service endpoint.
pub struct GraphqlLedger {
    client: Client,
    endpoint: String,
}

impl GraphqlLedger {
    pub fn new(service_url: &str, chain_id: &str, app_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/chains/{}/applications/{}",
                service_url.trim_end_matches('/'),
                chain_id,
                app_id
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<T: DeserializeOwned>(&self, operation: &str, query: &str, variables: Value) -> Result<T> {
        debug!("Ledger {} -> {}", operation, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::LedgerHttp {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphQLResponse<T> = response
            .json()
            .await
            .map_err(|e| OracleError::Ledger(format!("{operation}: malformed response: {e}")))?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(OracleError::Ledger(format!("{operation}: {}", messages.join("; "))));
        }

        envelope
            .data
            .ok_or_else(|| OracleError::Ledger(format!("{operation}: response carried no data")))
    }

    async fn mutate(&self, operation: &str, query: &str, variables: Value) -> Result<()> {
        self.execute::<Value>(operation, query, variables).await.map(|_| ())
    }
}

#[async_trait]
impl LedgerGateway for GraphqlLedger {
    async fn create_event(&self, event: &Event) -> Result<()> {
        self.mutate(
            "createEvent",
            CREATE_EVENT,
            json!({
                "id": event.id,
                "typeEvent": event.type_event.as_str(),
                "league": event.league,
                "home": event.teams.home,
                "away": event.teams.away,
                "homeOdds": event.odds.home,
                "awayOdds": event.odds.away,
                "tieOdds": event.odds.tie,
                "startTime": event.start_time.to_string(),
            }),
        )
        .await
    }

    async fn update_event_status(&self, event_id: &str, status: MatchStatus) -> Result<()> {
        self.mutate(
            "updateEventStatus",
            UPDATE_EVENT_STATUS,
            json!({ "eventId": event_id, "status": status.as_str() }),
        )
        .await
    }

    async fn update_event_odds(&self, event_id: &str, odds: Odds) -> Result<()> {
        self.mutate(
            "updateEventOdds",
            UPDATE_EVENT_ODDS,
            json!({
                "eventId": event_id,
                "homeOdds": odds.home,
                "awayOdds": odds.away,
                "tieOdds": odds.tie,
            }),
        )
        .await
    }

    async fn update_event_live_score(&self, event_id: &str, home: u32, away: u32) -> Result<()> {
        self.mutate(
            "updateEventLiveScore",
            UPDATE_EVENT_LIVE_SCORE,
            json!({
                "eventId": event_id,
                "homeScore": home.to_string(),
                "awayScore": away.to_string(),
            }),
        )
        .await
    }

    async fn update_current_minute(&self, event_id: &str, minute: u32) -> Result<()> {
        self.mutate(
            "updateCurrentMinute",
            UPDATE_CURRENT_MINUTE,
            json!({ "eventId": event_id, "currentMinute": minute }),
        )
        .await
    }

    async fn add_match_event(&self, event_id: &str, event: &MatchEvent) -> Result<()> {
        self.mutate(
            "addMatchEvent",
            ADD_MATCH_EVENT,
            json!({
                "eventId": event_id,
                "eventType": event.event_type.as_str(),
                "time": event.time.to_string(),
                "team": event.team,
                "player": event.player,
                "detail": event.detail,
                "timestamp": event.timestamp.to_string(),
            }),
        )
        .await
    }

    async fn resolve_event(&self, event_id: &str, result: &MatchResult) -> Result<()> {
        self.mutate(
            "resolveEvent",
            RESOLVE_EVENT,
            json!({
                "eventId": event_id,
                "winner": result.winner.as_str(),
                "homeScore": result.home_score.to_string(),
                "awayScore": result.away_score.to_string(),
            }),
        )
        .await
    }

    async fn update_team_power(&self, team: &Team) -> Result<()> {
        self.mutate(
            "updateTeamPower",
            UPDATE_TEAM_POWER,
            json!({
                "teamId": team.id,
                "name": team.name,
                "power": team.power,
                "form": team.form,
                "goalAverage": team.goal_average,
            }),
        )
        .await
    }

    async fn get_events(&self) -> Result<Vec<Event>> {
        let data: EventsData = self.execute("events", EVENTS_QUERY, json!({})).await?;
        data.events.into_iter().map(Event::try_from).collect()
    }

    async fn get_teams(&self) -> Result<Vec<Team>> {
        let data: TeamsData = self.execute("teams", TEAMS_QUERY, json!({})).await?;
        Ok(data
            .teams
            .into_iter()
            .map(|team| Team {
                id: team.id,
                name: team.name,
                power: team.power,
                form: team.form,
                goal_average: team.goal_average,
            })
            .collect())
    }

    async fn start_new_week(&self, week: u32, year: i32, prize_pool: &str) -> Result<()> {
        self.mutate(
            "startNewWeek",
            START_NEW_WEEK,
            json!({ "week": week, "year": year, "prizePool": prize_pool }),
        )
        .await
    }

    async fn end_current_week(&self, week: u32, year: i32) -> Result<()> {
        self.mutate(
            "endCurrentWeek",
            END_CURRENT_WEEK,
            json!({ "week": week, "year": year }),
        )
        .await
    }

    async fn leaderboard(&self) -> Result<Option<Leaderboard>> {
        let data: LeaderboardData = self.execute("leaderboard", LEADERBOARD_QUERY, json!({})).await?;
        Ok(data.leaderboard.map(|board| Leaderboard {
            week: board.week,
            year: board.year,
            prize_pool: board.prize_pool.map(|pool| match pool {
                Value::String(text) => text,
                other => other.to_string(),
            }),
            winners: Value::Null,
            user_stats: Value::Null,
        }))
    }

    async fn subscribe(&self, chain_id: &str) -> Result<()> {
        self.mutate("subscribe", SUBSCRIBE, json!({ "chainId": chain_id })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    fn decode(value: Value) -> Result<Event> {
        let raw: GqlEvent = serde_json::from_value(value)?;
        Event::try_from(raw)
    }

    fn base_event() -> Value {
        json!({
            "id": "1208021",
            "status": "LIVE",
            "typeEvent": "Football",
            "league": "La Liga",
            "teams": { "home": "Barcelona", "away": "Real Madrid" },
            "odds": { "home": 180, "away": 220, "tie": 320 },
            "startTime": "1700000000",
            "result": { "winner": "Home", "homeScore": "0", "awayScore": "0" },
            "liveScore": { "home": "3", "away": "1", "updatedAt": null },
            "matchEvents": [
                { "eventType": "Goal", "time": "12", "team": "Barcelona", "player": null, "detail": null, "timestamp": "1700000720000" }
            ],
            "currentMinute": 50
        })
    }

    #[test]
    fn test_decodes_live_event_and_drops_placeholder_result() {
        let event = decode(base_event()).unwrap();
        assert_eq!(event.status, MatchStatus::Live);
        assert_eq!(event.start_time, 1_700_000_000);
        assert_eq!(event.result, None);
        assert_eq!(event.score(), (3, 1));
        assert_eq!(event.current_minute, Some(50));
        assert_eq!(event.match_events[0].time, 12);
    }

    #[test]
    fn test_finished_event_keeps_result() {
        let mut raw = base_event();
        raw["status"] = json!("Finished");
        raw["result"] = json!({ "winner": "Away", "homeScore": 1, "awayScore": 2 });

        let event = decode(raw).unwrap();
        assert_eq!(event.result, Some(MatchResult::from_score(1, 2)));
    }

    #[test]
    fn test_unknown_status_fails_closed() {
        let mut raw = base_event();
        raw["status"] = json!("Abandoned");
        assert!(matches!(decode(raw), Err(OracleError::InvalidField { field: "status", .. })));
    }

    #[test]
    fn test_malformed_score_fails_closed() {
        let mut raw = base_event();
        raw["liveScore"]["home"] = json!("three");
        assert!(decode(raw).is_err());
    }

    /// Variable declarations of an operation, whitespace-normalised.
    fn declared_variables(operation: &str) -> Vec<String> {
        let open = operation.find('(').unwrap();
        let close = open + operation[open..].find(')').unwrap();
        operation[open + 1..close]
            .split(',')
            .map(|declaration| declaration.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|declaration| !declaration.is_empty())
            .collect()
    }

    #[test]
    fn test_mutation_variable_types_match_ledger_schema() {
        let expected: [(&str, &[&str]); 10] = [
            (
                CREATE_EVENT,
                &[
                    "$id: String!", "$typeEvent: String!", "$league: String!", "$home: String!",
                    "$away: String!", "$homeOdds: Int!", "$awayOdds: Int!", "$tieOdds: Int!",
                    "$startTime: String!",
                ],
            ),
            (UPDATE_EVENT_STATUS, &["$eventId: String!", "$status: String!"]),
            (
                UPDATE_EVENT_ODDS,
                &["$eventId: String!", "$homeOdds: Int!", "$awayOdds: Int!", "$tieOdds: Int!"],
            ),
            (
                UPDATE_EVENT_LIVE_SCORE,
                &["$eventId: String!", "$homeScore: String!", "$awayScore: String!"],
            ),
            (UPDATE_CURRENT_MINUTE, &["$eventId: String!", "$currentMinute: Int!"]),
            (
                ADD_MATCH_EVENT,
                &[
                    "$eventId: String!", "$eventType: String!", "$time: String!", "$team: String!",
                    "$player: String", "$detail: String", "$timestamp: String!",
                ],
            ),
            (
                RESOLVE_EVENT,
                &["$eventId: String!", "$winner: String!", "$homeScore: String!", "$awayScore: String!"],
            ),
            (
                UPDATE_TEAM_POWER,
                &["$teamId: String!", "$name: String!", "$power: Int!", "$form: Int!", "$goalAverage: Int!"],
            ),
            (START_NEW_WEEK, &["$week: Int!", "$year: Int!", "$prizePool: Amount!"]),
            (SUBSCRIBE, &["$chainId: ChainId!"]),
        ];

        for (operation, variables) in expected {
            assert_eq!(declared_variables(operation), variables.to_vec(), "{operation}");
        }
        assert_eq!(declared_variables(END_CURRENT_WEEK), vec!["$week: Int!", "$year: Int!"]);
    }

    async fn ledger_behind(router: Router) -> GraphqlLedger {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        GraphqlLedger::new(&format!("http://{addr}"), "chain", "app", Duration::from_secs(5)).unwrap()
    }

    fn answering(status: StatusCode, body: Value) -> Router {
        Router::new().route(
            "/chains/chain/applications/app",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        )
    }

    #[tokio::test]
    async fn test_non_success_status_is_ledger_http_error() {
        let ledger = ledger_behind(answering(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "boom" }))).await;

        let result = ledger.update_event_status("1208021", MatchStatus::Live).await;
        assert!(matches!(result, Err(OracleError::LedgerHttp { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_errors_array_is_ledger_error() {
        let ledger = ledger_behind(answering(
            StatusCode::OK,
            json!({ "data": null, "errors": [{ "message": "Event not found" }] }),
        ))
        .await;

        match ledger.update_current_minute("1208021", 51).await {
            Err(OracleError::Ledger(message)) => assert!(message.contains("Event not found")),
            other => panic!("expected ledger error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_data_is_ledger_error() {
        let ledger = ledger_behind(answering(StatusCode::OK, json!({}))).await;
        assert!(matches!(ledger.get_events().await, Err(OracleError::Ledger(_))));
    }

    #[tokio::test]
    async fn test_mutation_succeeds_with_data() {
        let ledger = ledger_behind(answering(
            StatusCode::OK,
            json!({ "data": { "resolveEvent": "0x01" } }),
        ))
        .await;
        assert!(ledger
            .resolve_event("1208021", &MatchResult::from_score(2, 1))
            .await
            .is_ok());
    }

    #[test]
    fn test_endpoint_layout() {
        let ledger = GraphqlLedger::new("http://localhost:8080/", "chain", "app", Duration::from_secs(5)).unwrap();
        assert_eq!(ledger.endpoint(), "http://localhost:8080/chains/chain/applications/app");
    }
}
