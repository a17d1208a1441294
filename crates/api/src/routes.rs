use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use oracle_models::{MatchStatus, MonitoringJob};
use oracle_services::{DemoEngine, DemoStatus, EventMonitor, MonitorStatus};
use serde::Serialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Engines the status endpoints report on. Exactly one is set in a running
/// oracle, depending on whether it runs in demo mode.
#[derive(Clone, Default)]
pub struct AppState {
    pub monitor: Option<Arc<EventMonitor>>,
    pub demo: Option<Arc<DemoEngine>>,
}

impl AppState {
    pub fn with_monitor(monitor: Arc<EventMonitor>) -> Self {
        Self {
            monitor: Some(monitor),
            demo: None,
        }
    }

    pub fn with_demo(demo: Arc<DemoEngine>) -> Self {
        Self {
            monitor: None,
            demo: Some(demo),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub event_id: String,
    pub fixture_id: String,
    pub status: &'static str,
    pub league: String,
    pub last_checked: String,
    pub poll_interval: String,
    pub retry_count: u32,
}

impl From<&MonitoringJob> for JobView {
    fn from(job: &MonitoringJob) -> Self {
        Self {
            event_id: job.event_id.clone(),
            fixture_id: job.fixture_id.clone(),
            status: job.status.as_str(),
            league: job.league.clone(),
            last_checked: job.last_checked.to_rfc3339(),
            poll_interval: format!("{}s", job.poll_interval_secs),
            retry_count: job.retry_count,
        }
    }
}

#[derive(Serialize, Default)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub live: usize,
    pub finished: usize,
    pub postponed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub total: usize,
    pub by_status: StatusCounts,
}

impl JobSummary {
    fn of(jobs: &[MonitoringJob]) -> Self {
        let mut by_status = StatusCounts::default();
        for job in jobs {
            match job.status {
                MatchStatus::Scheduled => by_status.scheduled += 1,
                MatchStatus::Live => by_status.live += 1,
                MatchStatus::Finished => by_status.finished += 1,
                MatchStatus::Postponed => by_status.postponed += 1,
            }
        }
        Self {
            total: jobs.len(),
            by_status,
        }
    }
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub monitor: Option<MonitorStatus>,
    pub jobs: Vec<JobView>,
    pub summary: JobSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo: Option<DemoStatus>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn get_status(State(state): State<AppState>) -> Response {
    if state.monitor.is_none() && state.demo.is_none() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Monitor not initialized" })),
        )
            .into_response();
    }

    let jobs = state
        .monitor
        .as_ref()
        .map(|monitor| monitor.jobs())
        .unwrap_or_default();

    Json(StatusResponse {
        monitor: state.monitor.as_ref().map(|monitor| monitor.status()),
        summary: JobSummary::of(&jobs),
        jobs: jobs.iter().map(JobView::from).collect(),
        demo: state.demo.as_ref().map(|demo| demo.status()),
    })
    .into_response()
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Serve the status endpoints until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("📊 Status server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use oracle_models::{League, ManualClock, OracleError, Result, Teams};
    use oracle_services::provider::{Fixture, MatchWinnerOdds, Standing};
    use oracle_services::{
        DemoSettings, EventResolver, InMemoryLedger, LedgerGateway, SportsDataProvider,
    };
    use oracle_store::{JobQueue, QueueSettings};
    use std::time::Duration;
    use tower::ServiceExt;

    struct OfflineProvider;

    #[async_trait]
    impl SportsDataProvider for OfflineProvider {
        async fn upcoming_fixtures(&self, _: &League, _: u32) -> Result<Vec<Fixture>> {
            Ok(Vec::new())
        }

        async fn fixture(&self, fixture_id: &str) -> Result<Fixture> {
            Err(OracleError::Provider(format!("fixture {fixture_id} unavailable")))
        }

        async fn match_winner_odds(&self, _: &str) -> Result<Option<MatchWinnerOdds>> {
            Ok(None)
        }

        async fn standings(&self, _: &League) -> Result<Vec<Standing>> {
            Ok(Vec::new())
        }

        async fn recent_fixtures(&self, _: &League, _: &str, _: u32) -> Result<Vec<Fixture>> {
            Ok(Vec::new())
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(create_router(AppState::default()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = get_json(create_router(AppState::default()), "/jobs").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn test_status_without_engine() {
        let (status, _) = get_json(create_router(AppState::default()), "/status").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_status_reports_monitor_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let ledger: Arc<dyn LedgerGateway> = Arc::new(InMemoryLedger::new());
        let queue = JobQueue::open(dir.path().join("queue.json"), QueueSettings::default(), clock());
        let monitor = Arc::new(EventMonitor::new(
            queue,
            Arc::new(OfflineProvider),
            ledger.clone(),
            Arc::new(EventResolver::new(ledger, None)),
            Duration::from_secs(60),
        ));
        monitor.add_event("1035037", "1035037", "La Liga");
        monitor.add_event("1035038", "1035038", "Serie A");

        let (status, body) = get_json(create_router(AppState::with_monitor(monitor)), "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["monitor"]["running"], false);
        assert_eq!(body["monitor"]["jobCount"], 2);
        assert_eq!(body["summary"]["total"], 2);
        assert_eq!(body["summary"]["byStatus"]["scheduled"], 2);
        assert_eq!(body["jobs"][0]["pollInterval"], "300s");
        assert_eq!(body["jobs"][0]["status"], "Scheduled");
        assert!(body.get("demo").is_none());
    }

    #[tokio::test]
    async fn test_status_reports_demo_engine() {
        let ledger: Arc<dyn LedgerGateway> = Arc::new(InMemoryLedger::new());
        let demo = Arc::new(DemoEngine::new(
            ledger.clone(),
            Arc::new(EventResolver::new(ledger, None)),
            clock(),
            DemoSettings::default(),
        ));
        demo.add_event("demo_1", "demo_1", Teams::new("PSG", "Marseille"));

        let (status, body) = get_json(create_router(AppState::with_demo(demo)), "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["monitor"].is_null());
        assert_eq!(body["summary"]["total"], 0);
        assert_eq!(body["demo"]["scheduled"], 1);
        assert_eq!(body["demo"]["live"], 0);
    }
}
