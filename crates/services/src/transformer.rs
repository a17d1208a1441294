use oracle_models::{Event, Odds, TeamIds, Teams};

use crate::odds::fetch_odds_or_default;
use crate::provider::{Fixture, SportsDataProvider};

/// Canonical event for a provider fixture, priced with `odds`.
///
/// The event id is the provider fixture id so the monitor can poll the
/// fixture back from it. No result is attached until resolution.
pub fn build_event(fixture: &Fixture, league: &str, odds: Odds) -> Event {
    Event::new(
        fixture.id.clone(),
        league,
        Teams::new(fixture.home.name.clone(), fixture.away.name.clone()),
        odds,
        fixture.timestamp,
    )
    .with_status(fixture.status())
    .with_team_ids(TeamIds {
        home: fixture.home.id.clone(),
        away: fixture.away.id.clone(),
    })
}

/// Fetch bookmaker odds for the fixture and build its event.
pub async fn transform_fixture(provider: &dyn SportsDataProvider, fixture: &Fixture, league: &str) -> Event {
    let odds = fetch_odds_or_default(provider, &fixture.id).await;
    build_event(fixture, league, odds)
}
