use oracle_models::Odds;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use crate::provider::{MatchWinnerOdds, SportsDataProvider};

/// Quotes above this are shortened by the house margin.
const MARGIN_THRESHOLD: Decimal = dec!(2.00);
const MARGIN_FACTOR: Decimal = dec!(0.85);

/// Apply the house margin to one decimal quote and convert it to fixed
/// point, rounding half away from zero (`2.50` becomes `213`).
pub fn adjust_quote(raw: Decimal) -> u64 {
    let adjusted = if raw > MARGIN_THRESHOLD {
        raw * MARGIN_FACTOR
    } else {
        raw
    };

    (adjusted * dec!(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0)
}

pub fn adjust(quotes: &MatchWinnerOdds) -> Odds {
    Odds::new(
        adjust_quote(quotes.home),
        adjust_quote(quotes.away),
        adjust_quote(quotes.draw),
    )
}

/// Adjusted bookmaker odds for a fixture, `None` when unavailable.
pub async fn fetch_odds(provider: &dyn SportsDataProvider, fixture_id: &str) -> Option<Odds> {
    match provider.match_winner_odds(fixture_id).await {
        Ok(Some(quotes)) => {
            let odds = adjust(&quotes);
            debug!(
                "Fixture {} odds {}/{}/{} -> {}/{}/{}",
                fixture_id, quotes.home, quotes.away, quotes.draw, odds.home, odds.away, odds.tie
            );
            Some(odds)
        }
        Ok(None) => {
            warn!("No match-winner market for fixture {}", fixture_id);
            None
        }
        Err(e) => {
            warn!("Error fetching odds for fixture {}: {}", fixture_id, e);
            None
        }
    }
}

/// Adjusted odds for a new event, falling back to [`Odds::DEFAULT`].
pub async fn fetch_odds_or_default(provider: &dyn SportsDataProvider, fixture_id: &str) -> Odds {
    fetch_odds(provider, fixture_id).await.unwrap_or(Odds::DEFAULT)
}
