use chrono::{DateTime, Utc};
use oracle_models::{Event, Odds, Teams};

const CATALOGUE: [(&str, &str, &str, Odds); 5] = [
    ("La Liga", "Barcelona", "Real Madrid", Odds { home: 180, away: 220, tie: 320 }),
    ("Premier League", "Manchester City", "Liverpool", Odds { home: 190, away: 210, tie: 310 }),
    ("Serie A", "Juventus", "Inter Milan", Odds { home: 200, away: 200, tie: 300 }),
    ("Bundesliga", "Bayern Munich", "Borussia Dortmund", Odds { home: 170, away: 240, tie: 330 }),
    ("Ligue 1", "PSG", "Marseille", Odds { home: 150, away: 280, tie: 350 }),
];

/// Fixed demo fixtures for running without a sports-data provider, kicking
/// off one hour apart starting an hour from `now`.
pub fn demo_events(now: DateTime<Utc>) -> Vec<Event> {
    let stamp = now.timestamp_millis();
    CATALOGUE
        .iter()
        .zip(1_i64..)
        .map(|((league, home, away, odds), n)| {
            Event::new(
                format!("demo_{stamp}_{n}"),
                *league,
                Teams::new(*home, *away),
                *odds,
                now.timestamp() + n * 3600,
            )
        })
        .collect()
}
