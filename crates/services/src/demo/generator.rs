use oracle_models::{MatchEvent, MatchEventType, Teams};
use rand::Rng;

const GOAL_DETAILS: [&str; 4] = ["Normal Goal", "Header", "Penalty", "Free Kick"];

/// Per-minute chances of each simulated sub-event.
#[derive(Debug, Clone)]
pub struct EventProbabilities {
    pub goal: f64,
    pub yellow_card: f64,
    pub red_card: f64,
    pub substitution: f64,
    /// Substitutions are only considered after this minute...
    pub substitution_after: u32,
    /// ...and only on multiples of this.
    pub substitution_every: u32,
}

impl Default for EventProbabilities {
    fn default() -> Self {
        Self {
            goal: 0.03,
            yellow_card: 0.04,
            red_card: 0.005,
            substitution: 0.6,
            substitution_after: 45,
            substitution_every: 15,
        }
    }
}

/// Rolls at most one sub-event per simulated minute, in priority order:
/// goal, yellow card, red card, substitution.
#[derive(Debug, Clone, Default)]
pub struct MatchEventGenerator {
    probabilities: EventProbabilities,
}

impl MatchEventGenerator {
    pub fn new(probabilities: EventProbabilities) -> Self {
        Self { probabilities }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R, minute: u32, teams: &Teams, timestamp: i64) -> Option<MatchEvent> {
        let p = &self.probabilities;

        let event_type = if rng.gen_bool(p.goal) {
            MatchEventType::Goal
        } else if rng.gen_bool(p.yellow_card) {
            MatchEventType::YellowCard
        } else if rng.gen_bool(p.red_card) {
            MatchEventType::RedCard
        } else if self.substitution_window(minute) && rng.gen_bool(p.substitution) {
            MatchEventType::Substitution
        } else {
            return None;
        };

        let team = if rng.gen_bool(0.5) { &teams.home } else { &teams.away };
        let player = format!("Player {}", rng.gen_range(1..=11));
        let detail = match event_type {
            MatchEventType::Goal => Some(GOAL_DETAILS[rng.gen_range(0..GOAL_DETAILS.len())].to_string()),
            MatchEventType::Substitution => Some(format!("Player {} in", rng.gen_range(12..=23))),
            _ => None,
        };

        Some(MatchEvent {
            event_type,
            time: minute,
            team: team.clone(),
            player: Some(player),
            detail,
            timestamp,
        })
    }

    fn substitution_window(&self, minute: u32) -> bool {
        let p = &self.probabilities;
        minute > p.substitution_after && p.substitution_every > 0 && minute % p.substitution_every == 0
    }
}
