use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{Event, MatchEvent, MatchEventType, MatchResult, MatchStatus, Teams};

/// Durable queue entry tracking one event under real-data polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringJob {
    pub fixture_id: String,
    pub event_id: String,
    pub status: MatchStatus,
    pub last_checked: DateTime<Utc>,
    pub poll_interval_secs: u64,
    pub retry_count: u32,
    pub league: String,
}

impl MonitoringJob {
    pub fn new(
        fixture_id: impl Into<String>,
        event_id: impl Into<String>,
        league: impl Into<String>,
        now: DateTime<Utc>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            fixture_id: fixture_id.into(),
            event_id: event_id.into(),
            status: MatchStatus::Scheduled,
            last_checked: now,
            poll_interval_secs: poll_interval.as_secs(),
            retry_count: 0,
            league: league.into(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.last_checked).num_seconds();
        u64::try_from(elapsed).is_ok_and(|elapsed| elapsed >= self.poll_interval_secs)
    }
}

/// On-disk shape of the job queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventQueue {
    pub jobs: Vec<MonitoringJob>,
    pub last_updated: DateTime<Utc>,
}

impl EventQueue {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            jobs: Vec::new(),
            last_updated: now,
        }
    }
}

/// Demo-mode registration of an event waiting to kick off or being simulated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DemoEvent {
    pub event_id: String,
    pub fixture_id: String,
    pub teams: Teams,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub start_delay_secs: u64,
    pub live_at: Option<DateTime<Utc>>,
}

impl DemoEvent {
    pub fn new(
        event_id: impl Into<String>,
        fixture_id: impl Into<String>,
        teams: Teams,
        created_at: DateTime<Utc>,
        start_delay: Duration,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            fixture_id: fixture_id.into(),
            teams,
            status: MatchStatus::Scheduled,
            created_at,
            start_delay_secs: start_delay.as_secs(),
            live_at: None,
        }
    }

    /// Wall-clock instant after which the event may go live.
    pub fn kickoff_deadline(&self) -> DateTime<Utc> {
        let delay = i64::try_from(self.start_delay_secs.min(u64::from(u32::MAX))).unwrap_or(0);
        self.created_at
            .checked_add_signed(chrono::Duration::seconds(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.status == MatchStatus::Scheduled && now >= self.kickoff_deadline()
    }

    /// Push the kickoff back instead of dropping the event.
    pub fn defer(&mut self, by: Duration) {
        self.start_delay_secs = self.start_delay_secs.saturating_add(by.as_secs());
    }
}

/// Running state of one simulated live match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchSimulation {
    pub event_id: String,
    pub teams: Teams,
    pub match_minute: u32,
    pub home_score: u32,
    pub away_score: u32,
    pub events: Vec<MatchEvent>,
    pub started_at: DateTime<Utc>,
}

impl MatchSimulation {
    pub fn new(event_id: impl Into<String>, teams: Teams, started_at: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.into(),
            teams,
            match_minute: 0,
            home_score: 0,
            away_score: 0,
            events: Vec::new(),
            started_at,
        }
    }

    /// Rebuild the simulation of a live ledger event after a restart.
    pub fn resume(event: &Event, now: DateTime<Utc>) -> Self {
        let (home_score, away_score) = event.score();
        Self {
            event_id: event.id.clone(),
            teams: event.teams.clone(),
            match_minute: event.current_minute.unwrap_or(0),
            home_score,
            away_score,
            events: event.match_events.clone(),
            started_at: now,
        }
    }

    /// Append a sub-event, counting goals into the running score.
    pub fn record(&mut self, event: MatchEvent) {
        if event.event_type == MatchEventType::Goal {
            if event.team == self.teams.home {
                self.home_score += 1;
            } else {
                self.away_score += 1;
            }
        }
        self.events.push(event);
    }

    pub fn result(&self) -> MatchResult {
        MatchResult::from_score(self.home_score, self.away_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Odds, Selection};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_job_due_after_poll_interval() {
        let job = MonitoringJob::new("1", "1", "La Liga", at(0), Duration::from_secs(300));
        assert!(!job.is_due(at(299)));
        assert!(job.is_due(at(300)));
        assert!(job.is_due(at(1000)));
    }

    #[test]
    fn test_demo_event_defer_moves_deadline() {
        let mut event = DemoEvent::new("e1", "f1", Teams::new("A", "B"), at(0), Duration::from_secs(30));
        assert!(!event.is_ready(at(29)));
        assert!(event.is_ready(at(30)));

        event.defer(Duration::from_secs(90));
        assert!(!event.is_ready(at(30)));
        assert!(event.is_ready(at(120)));
    }

    #[test]
    fn test_simulation_records_goals_per_side() {
        let mut sim = MatchSimulation::new("e1", Teams::new("PSG", "Marseille"), at(0));
        let goal = |team: &str, time| MatchEvent {
            event_type: MatchEventType::Goal,
            time,
            team: team.to_string(),
            player: None,
            detail: None,
            timestamp: 0,
        };

        sim.record(goal("PSG", 12));
        sim.record(goal("Marseille", 40));
        sim.record(goal("PSG", 77));
        sim.record(MatchEvent {
            event_type: MatchEventType::YellowCard,
            ..goal("Marseille", 80)
        });

        assert_eq!((sim.home_score, sim.away_score), (2, 1));
        assert_eq!(sim.events.len(), 4);
        assert_eq!(sim.result().winner, Selection::Home);
    }

    #[test]
    fn test_resume_keeps_ledger_progress() {
        let mut event = Event::new("e9", "Serie A", Teams::new("Juventus", "Inter Milan"), Odds::DEFAULT, 0)
            .with_status(MatchStatus::Live);
        event.current_minute = Some(50);
        event.live_score = Some(crate::events::LiveScore {
            home: 3,
            away: 1,
            updated_at: None,
        });

        let sim = MatchSimulation::resume(&event, at(0));
        assert_eq!(sim.match_minute, 50);
        assert_eq!((sim.home_score, sim.away_score), (3, 1));
    }
}
