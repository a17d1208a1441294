use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use oracle_models::{Clock, Result};
use tracing::{info, warn};

use crate::ledger::LedgerGateway;

/// ISO-8601 week number and week-based year of an instant.
pub fn iso_week(at: DateTime<Utc>) -> (u32, i32) {
    let week = at.iso_week();
    (week.week(), week.year())
}

/// Opens and closes the ledger's weekly betting leaderboard.
pub struct LeaderboardManager {
    ledger: Arc<dyn LedgerGateway>,
    clock: Arc<dyn Clock>,
    prize_pool: String,
}

impl LeaderboardManager {
    pub fn new(ledger: Arc<dyn LedgerGateway>, clock: Arc<dyn Clock>, prize_pool: impl Into<String>) -> Self {
        Self {
            ledger,
            clock,
            prize_pool: prize_pool.into(),
        }
    }

    /// Start the current week unless the ledger already has it open.
    /// Returns whether a week was started.
    pub async fn start_week(&self) -> Result<bool> {
        let (week, year) = iso_week(self.clock.now());

        if let Some(board) = self.ledger.leaderboard().await? {
            if board.is_week(week, year) {
                info!("Leaderboard for week {}-{} already exists, skipping", year, week);
                return Ok(false);
            }
        }

        self.ledger.start_new_week(week, year, &self.prize_pool).await?;
        info!(
            "🏆 Leaderboard week {}-{} started with prize pool {}",
            year, week, self.prize_pool
        );
        Ok(true)
    }

    pub async fn end_week(&self, week: u32, year: i32) -> Result<()> {
        self.ledger.end_current_week(week, year).await?;
        info!("Leaderboard week {}-{} ended", year, week);
        Ok(())
    }

    /// Bring the ledger in line with the calendar: close a stale week if
    /// one is still open, then open the current one. A stale week that
    /// cannot be closed does not block the new one.
    pub async fn rollover(&self) -> Result<()> {
        let (week, year) = iso_week(self.clock.now());

        match self.ledger.leaderboard().await? {
            Some(board) if board.is_week(week, year) => return Ok(()),
            Some(board) => {
                if let Err(e) = self.end_week(board.week, board.year).await {
                    warn!(
                        "Failed to end leaderboard week {}-{}: {}",
                        board.year, board.week, e
                    );
                }
            }
            None => {}
        }

        self.start_week().await.map(|_| ())
    }
}
