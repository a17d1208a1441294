mod config;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use oracle_api::AppState;
use oracle_models::{Clock, SystemClock};
use oracle_services::{
    ApiSportsClient, DemoEngine, EventMonitor, EventRegistrar, EventResolver, FixtureIngestor,
    GraphqlLedger, InMemoryLedger, LeaderboardManager, LedgerGateway, PowerRankingService,
    RankingMode, SportsDataProvider,
};
use oracle_store::JobQueue;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::scheduler::Scheduler;

const DEFAULT_LOG_FILTER: &str =
    "matchday_oracle=info,oracle_services=info,oracle_store=info,tower_http=info";

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::new();
    init_tracing(config.as_ref().is_ok_and(|config| config.log.json));
    let config = config.context("invalid configuration")?;

    info!("🎯 Starting Matchday Oracle");
    info!("📊 Ledger: {} (chain {}, app {})", config.ledger.service_url, config.ledger.chain_id, config.ledger.app_id);
    if config.oracle.demo_mode {
        info!("🎮 Demo mode enabled, matches are simulated");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ledger: Arc<dyn LedgerGateway> = if config.ledger.in_memory {
        warn!("Using in-memory ledger, nothing is persisted");
        Arc::new(InMemoryLedger::new())
    } else {
        Arc::new(
            GraphqlLedger::new(
                &config.ledger.service_url,
                &config.ledger.chain_id,
                &config.ledger.app_id,
                Duration::from_secs(config.ledger.request_timeout_secs),
            )
            .context("failed to build ledger client")?,
        )
    };

    let provider: Option<Arc<dyn SportsDataProvider>> = if config.has_provider_key() {
        Some(Arc::new(
            ApiSportsClient::new(config.provider_settings())
                .context("failed to build sports-data client")?,
        ))
    } else {
        None
    };

    let leagues = config.leagues();
    let mode = if config.oracle.demo_mode {
        RankingMode::Simulated
    } else {
        RankingMode::RealData
    };
    let rankings = Arc::new(PowerRankingService::new(
        ledger.clone(),
        provider.clone(),
        leagues.clone(),
        mode,
    ));
    let resolver = Arc::new(EventResolver::new(ledger.clone(), Some(rankings.clone())));

    if let Some(main_chain) = &config.ledger.main_chain_id {
        match ledger.subscribe(main_chain).await {
            Ok(()) => info!("✅ Subscribed to main chain {}", main_chain),
            Err(e) => warn!("Failed to subscribe to main chain {}: {}", main_chain, e),
        }
    }

    let shutdown = CancellationToken::new();
    let mut handles = Vec::new();

    let (state, registrar, demo, monitor) = if config.oracle.demo_mode {
        let demo = Arc::new(DemoEngine::new(
            ledger.clone(),
            resolver,
            clock.clone(),
            config.demo_settings(),
        ));
        match demo.resume_live_events().await {
            Ok(resumed) if resumed > 0 => info!("🔄 Resumed {} live matches", resumed),
            Ok(_) => {}
            Err(e) => error!("Failed to resume live matches: {}", e),
        }
        if let Err(e) = demo.load_existing_events().await {
            error!("Failed to load scheduled events: {}", e);
        }
        handles.push(tokio::spawn(demo.clone().run()));

        let registrar: Arc<dyn EventRegistrar> = demo.clone();
        (AppState::with_demo(demo.clone()), registrar, Some(demo), None)
    } else {
        let provider = provider
            .clone()
            .context("a sports-data provider is required outside demo mode")?;
        let queue = JobQueue::open(config.oracle.queue_file.clone(), config.queue_settings(), clock.clone());
        let monitor = Arc::new(EventMonitor::new(
            queue,
            provider,
            ledger.clone(),
            resolver,
            Duration::from_secs(config.oracle.monitor_tick_secs),
        ));
        handles.push(tokio::spawn(monitor.clone().run()));

        let registrar: Arc<dyn EventRegistrar> = monitor.clone();
        (AppState::with_monitor(monitor.clone()), registrar, None, Some(monitor))
    };

    let ingestor = Arc::new(FixtureIngestor::new(
        ledger.clone(),
        provider,
        registrar,
        clock.clone(),
        leagues,
        config.ingest_settings(),
    ));
    let mut scheduler = Scheduler::new(
        ingestor,
        Duration::from_secs(config.oracle.ingest_interval_secs),
        shutdown.clone(),
    )
    .with_rankings(rankings);
    if let Some(demo) = &demo {
        scheduler = scheduler.with_demo(demo.clone());
    }
    if config.leaderboard.enabled {
        scheduler = scheduler.with_leaderboard(Arc::new(LeaderboardManager::new(
            ledger.clone(),
            clock.clone(),
            config.leaderboard.prize_pool.clone(),
        )));
    }
    handles.extend(scheduler.spawn());

    let addr = config.server_addr().context("invalid server address")?;
    let server_shutdown = shutdown.clone();
    handles.push(tokio::spawn(async move {
        let signal = async move { server_shutdown.cancelled().await };
        if let Err(e) = oracle_api::serve(addr, state, signal).await {
            error!("Status server error: {}", e);
        }
    }));

    info!("✅ All services started");
    info!("⌨️  Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("👋 Shutting down gracefully");

    if let Some(demo) = &demo {
        demo.stop();
    }
    if let Some(monitor) = &monitor {
        monitor.stop();
    }
    shutdown.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Task ended abnormally: {}", e);
        }
    }

    Ok(())
}
