//! System endpoints: health check and the dashboard snapshot.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::{DashboardResponse, KindPanel};
use crate::app_state::AppState;
use crate::domain::RequestKind;
use crate::projection::{Aggregates, join_requests};
use crate::service::{Snapshot, load_snapshot};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

fn panel(snapshot: &Snapshot, kind: RequestKind) -> KindPanel {
    let requests = snapshot.requests_of(kind);
    KindPanel {
        rows: join_requests(requests, &snapshot.users),
        stats: Aggregates::compute(requests),
    }
}

/// `GET /dashboard` — Every collection joined and aggregated.
///
/// The bulk fetch runs under the init bound; collections that fail or
/// time out come back empty rather than failing the whole response.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "System",
    summary = "Full dashboard snapshot",
    description = "Fetches all request collections and users under a hard time bound, joins each collection with its owners, and recomputes per-kind aggregates. Collections that cannot be fetched in time are returned empty.",
    responses(
        (status = 200, description = "Dashboard snapshot", body = DashboardResponse),
    )
)]
pub async fn dashboard_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = load_snapshot(state.store.as_ref(), state.config.init_timeout()).await;

    Json(DashboardResponse {
        investments: panel(&snapshot, RequestKind::Investment),
        deposits: panel(&snapshot, RequestKind::Deposit),
        withdrawals: panel(&snapshot, RequestKind::Withdrawal),
        loans: panel(&snapshot, RequestKind::Loan),
        kyc: panel(&snapshot, RequestKind::Kyc),
        users: snapshot.users,
    })
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// System routes mounted under /api/v1.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard_handler))
}
