use std::sync::Arc;

use oracle_models::{MatchResult, Result};
use tracing::info;

use crate::ledger::LedgerGateway;
use crate::power_ranking::PowerRankingService;

/// Writes final outcomes to the ledger and triggers the power-ranking
/// follow-up. Shared by the real-data monitor and the demo engine.
pub struct EventResolver {
    ledger: Arc<dyn LedgerGateway>,
    rankings: Option<Arc<PowerRankingService>>,
}

impl EventResolver {
    pub fn new(ledger: Arc<dyn LedgerGateway>, rankings: Option<Arc<PowerRankingService>>) -> Self {
        Self { ledger, rankings }
    }

    /// Resolve an event. Only the ledger write can fail; the power update
    /// afterwards is best effort.
    pub async fn resolve(&self, event_id: &str, result: MatchResult) -> Result<()> {
        self.ledger.resolve_event(event_id, &result).await?;
        info!(
            "🏁 Resolved event {}: {} ({}-{})",
            event_id, result.winner, result.home_score, result.away_score
        );

        if let Some(rankings) = &self.rankings {
            rankings.update_after_match(event_id, &result).await;
        }
        Ok(())
    }
}
