use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use oracle_models::League;
use oracle_services::{ApiSportsSettings, DemoSettings, IngestSettings};
use oracle_store::QueueSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub provider: ProviderConfig,
    pub oracle: OracleConfig,
    pub leaderboard: LeaderboardConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
    #[serde(default = "default_leagues")]
    pub leagues: Vec<LeagueConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub service_url: String,
    pub chain_id: String,
    pub app_id: String,
    pub main_chain_id: Option<String>,
    /// Keep events in process memory instead of talking to a ledger node.
    pub in_memory: bool,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub host: String,
    pub bookmaker_id: u64,
    pub request_timeout_secs: u64,
    pub fixtures_per_league: u32,
    pub season: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub demo_mode: bool,
    pub max_scheduled_events: usize,
    pub max_live_events: usize,
    pub queue_file: PathBuf,
    pub monitor_tick_secs: u64,
    pub detection_tick_secs: u64,
    pub minute_tick_secs: u64,
    pub retry_ceiling: u32,
    pub poll_interval_scheduled_secs: u64,
    pub poll_interval_live_secs: u64,
    pub start_delay_min_secs: u64,
    pub start_delay_max_secs: u64,
    pub defer_min_secs: u64,
    pub defer_max_secs: u64,
    pub max_live_duration_secs: u64,
    pub ingest_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    pub enabled: bool,
    pub prize_pool: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueConfig {
    pub id: String,
    pub name: String,
    /// Falls back to `provider.season`.
    pub season: Option<String>,
}

fn default_leagues() -> Vec<LeagueConfig> {
    [
        ("140", "La Liga"),
        ("39", "Premier League"),
        ("78", "Bundesliga"),
        ("135", "Serie A"),
        ("61", "Ligue 1"),
    ]
    .into_iter()
    .map(|(id, name)| LeagueConfig {
        id: id.to_string(),
        name: name.to_string(),
        season: None,
    })
    .collect()
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("ORACLE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("ledger.service_url", "http://localhost:8080")?
            .set_default("ledger.chain_id", "")?
            .set_default("ledger.app_id", "")?
            .set_default("ledger.in_memory", false)?
            .set_default("ledger.request_timeout_secs", 10)?
            .set_default("provider.base_url", "https://v3.football.api-sports.io")?
            .set_default("provider.api_key", "")?
            .set_default("provider.host", "v3.football.api-sports.io")?
            .set_default("provider.bookmaker_id", 8)?
            .set_default("provider.request_timeout_secs", 10)?
            .set_default("provider.fixtures_per_league", 36)?
            .set_default("provider.season", "2025")?
            .set_default("oracle.demo_mode", false)?
            .set_default("oracle.max_scheduled_events", 10)?
            .set_default("oracle.max_live_events", 3)?
            .set_default("oracle.queue_file", "data/event-queue.json")?
            .set_default("oracle.monitor_tick_secs", 60)?
            .set_default("oracle.detection_tick_secs", 30)?
            .set_default("oracle.minute_tick_secs", 60)?
            .set_default("oracle.retry_ceiling", 10)?
            .set_default("oracle.poll_interval_scheduled_secs", 300)?
            .set_default("oracle.poll_interval_live_secs", 120)?
            .set_default("oracle.start_delay_min_secs", 30)?
            .set_default("oracle.start_delay_max_secs", 300)?
            .set_default("oracle.defer_min_secs", 60)?
            .set_default("oracle.defer_max_secs", 120)?
            .set_default("oracle.max_live_duration_secs", 7200)?
            .set_default("oracle.ingest_interval_secs", 600)?
            .set_default("leaderboard.enabled", true)?
            .set_default("leaderboard.prize_pool", "10000")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 9999)?
            .set_default("log.json", false)
    }

    /// Reject configurations the oracle cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.ledger.app_id.trim().is_empty() {
            missing.push("ledger.app_id");
        }
        if self.ledger.chain_id.trim().is_empty() {
            missing.push("ledger.chain_id");
        }
        if !self.oracle.demo_mode && self.provider.api_key.trim().is_empty() {
            missing.push("provider.api_key");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "missing required configuration: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn server_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    pub fn leagues(&self) -> Vec<League> {
        self.leagues
            .iter()
            .map(|league| {
                League::new(
                    league.id.as_str(),
                    league.name.as_str(),
                    league.season.as_deref().unwrap_or(&self.provider.season),
                )
            })
            .collect()
    }

    pub fn has_provider_key(&self) -> bool {
        !self.provider.api_key.trim().is_empty()
    }

    pub fn provider_settings(&self) -> ApiSportsSettings {
        ApiSportsSettings {
            base_url: self.provider.base_url.clone(),
            api_key: self.provider.api_key.clone(),
            host: self.provider.host.clone(),
            bookmaker_id: self.provider.bookmaker_id,
            timeout: Duration::from_secs(self.provider.request_timeout_secs),
        }
    }

    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            poll_interval_scheduled: Duration::from_secs(self.oracle.poll_interval_scheduled_secs),
            poll_interval_live: Duration::from_secs(self.oracle.poll_interval_live_secs),
            retry_ceiling: self.oracle.retry_ceiling,
        }
    }

    pub fn demo_settings(&self) -> DemoSettings {
        DemoSettings {
            max_live_events: self.oracle.max_live_events,
            detection_tick: Duration::from_secs(self.oracle.detection_tick_secs),
            minute_tick: Duration::from_secs(self.oracle.minute_tick_secs),
            start_delay_min: Duration::from_secs(self.oracle.start_delay_min_secs),
            start_delay_max: Duration::from_secs(self.oracle.start_delay_max_secs),
            defer_min: Duration::from_secs(self.oracle.defer_min_secs),
            defer_max: Duration::from_secs(self.oracle.defer_max_secs),
            max_live_duration: Duration::from_secs(self.oracle.max_live_duration_secs),
            ..DemoSettings::default()
        }
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            max_scheduled_events: self.oracle.max_scheduled_events,
            fixtures_per_league: self.provider.fixtures_per_league,
            ..IngestSettings::default()
        }
    }
}
