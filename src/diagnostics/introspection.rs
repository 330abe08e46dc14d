//! Introspection HTTP endpoint.
//!
//! # Endpoints
//! - `GET /debug/health`: liveness
//! - `GET /debug/vars`: runtime state as JSON
//! - `GET /debug/metrics`: Prometheus text exposition
//! - `GET /debug/pprof/profile?seconds=N&frequency=F`: on-demand CPU flamegraph
//!
//! The server runs detached and has no stop operation. It lives until the
//! process exits.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::diagnostics::cpu;
use crate::diagnostics::session::{DiagnosticsError, SessionKind, SessionStack};
use crate::lifecycle::AppContext;
use crate::observability::{metrics, Verbosity};

const DEFAULT_PROFILE_SECS: u64 = 30;
const MAX_PROFILE_SECS: u64 = 300;

/// State injected into handlers.
#[derive(Clone)]
pub struct IntrospectionState {
    pub ctx: Arc<AppContext>,
    pub sessions: Arc<SessionStack>,
    pub metrics: PrometheusHandle,
}

impl IntrospectionState {
    pub fn new(ctx: Arc<AppContext>, sessions: Arc<SessionStack>) -> Self {
        Self {
            ctx,
            sessions,
            metrics: metrics::handle(),
        }
    }
}

/// A running introspection listener.
pub struct IntrospectionServer {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl IntrospectionServer {
    /// Bind `addr` and serve in the background.
    pub async fn start(addr: &str, state: IntrospectionState) -> Result<Self, DiagnosticsError> {
        let bind_err = |e| DiagnosticsError::Bind {
            addr: addr.to_string(),
            source: e,
        };

        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let app = router(state);
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "introspection server stopped");
            }
        });

        Ok(Self { local_addr, task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

pub fn router(state: IntrospectionState) -> Router {
    Router::new()
        .route("/debug/health", get(get_health))
        .route("/debug/vars", get(get_vars))
        .route("/debug/metrics", get(get_metrics))
        .route("/debug/pprof/profile", get(get_profile))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
pub struct RuntimeVars {
    pub version: String,
    pub pid: u32,
    pub run_id: Uuid,
    pub uptime_secs: u64,
    pub verbosity: Verbosity,
    pub debug_mode: bool,
    pub sessions: Vec<SessionKind>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    pub seconds: Option<u64>,
    pub frequency: Option<i32>,
}

async fn get_health() -> &'static str {
    "ok"
}

async fn get_vars(State(state): State<IntrospectionState>) -> Json<RuntimeVars> {
    Json(RuntimeVars {
        version: env!("CARGO_PKG_VERSION").to_string(),
        pid: std::process::id(),
        run_id: state.ctx.run_id,
        uptime_secs: state.ctx.uptime().as_secs(),
        verbosity: state.ctx.verbosity(),
        debug_mode: state.ctx.debug_mode(),
        sessions: state.sessions.active(),
    })
}

async fn get_metrics(State(state): State<IntrospectionState>) -> String {
    metrics::record_uptime(state.ctx.uptime());
    state.metrics.render()
}

async fn get_profile(Query(params): Query<ProfileParams>) -> Response {
    let seconds = params
        .seconds
        .unwrap_or(DEFAULT_PROFILE_SECS)
        .clamp(1, MAX_PROFILE_SECS);
    let frequency = params.frequency.unwrap_or(cpu::DEFAULT_FREQUENCY).clamp(1, 1000);

    tracing::info!(seconds, frequency, "capturing cpu profile");
    let result = tokio::task::spawn_blocking(move || {
        cpu::capture_flamegraph(Duration::from_secs(seconds), frequency)
    })
    .await;

    match result {
        Ok(Ok(svg)) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Ok(Err(e @ DiagnosticsError::Start { .. })) => {
            (StatusCode::CONFLICT, e.to_string()).into_response()
        }
        Ok(Err(e @ DiagnosticsError::Unsupported(_))) => {
            (StatusCode::NOT_IMPLEMENTED, e.to_string()).into_response()
        }
        Ok(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
