pub mod demo;
pub mod event_monitor;
pub mod ingest;
pub mod leaderboard;
pub mod ledger;
pub mod odds;
pub mod power_ranking;
pub mod provider;
pub mod resolution;
pub mod transformer;

pub use demo::{DemoEngine, DemoSettings, DemoStatus, TickOutcome};
pub use event_monitor::{EventMonitor, MonitorStatus};
pub use ingest::{EventRegistrar, FixtureIngestor, IngestSettings};
pub use leaderboard::LeaderboardManager;
pub use ledger::{GraphqlLedger, InMemoryLedger, LedgerGateway};
pub use power_ranking::{PowerRankingService, RankingMode};
pub use provider::{ApiSportsClient, ApiSportsSettings, SportsDataProvider};
pub use resolution::EventResolver;
