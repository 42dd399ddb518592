//! Request collection handlers: list, stats, detail, decision.
//!
//! The `{kind}` path segment accepts singular or plural forms
//! (`deposit`/`deposits`). Every read re-fetches from the record store
//! and re-joins; handlers never serve a cached view.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::AdminAuth;
use crate::api::dto::{
    DecisionResponse, PaginationParams, RequestDetailResponse, RequestListResponse,
    RequestStatsResponse,
};
use crate::app_state::AppState;
use crate::domain::{Decision, RequestDetails, RequestId, RequestKind};
use crate::error::{ConsoleError, ErrorResponse};
use crate::links;
use crate::projection::{Aggregates, join_requests};
use crate::service::bounded;

fn parse_kind(kind: &str) -> Result<RequestKind, ConsoleError> {
    kind.parse()
        .map_err(|()| ConsoleError::ValidationError(format!("unknown request kind: {kind}")))
}

/// `GET /requests/{kind}` — List requests of one kind, joined with users.
///
/// # Errors
///
/// Returns [`ConsoleError::ValidationError`] for an unknown kind.
#[utoipa::path(
    get,
    path = "/api/v1/requests/{kind}",
    tag = "Requests",
    summary = "List requests of one kind",
    description = "Returns a paginated list of requests joined with their owning users. Requests whose owner was deleted show `user_name = \"Unknown User\"`.",
    params(
        ("kind" = String, Path, description = "Request kind: investment, deposit, withdrawal, loan, or kyc"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated request list", body = RequestListResponse),
        (status = 400, description = "Unknown request kind", body = ErrorResponse),
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ConsoleError> {
    let kind = parse_kind(&kind)?;
    let bound = state.config.fetch_timeout();

    let requests = bounded(bound, "list requests", state.store.list_requests(kind)).await?;
    let users = bounded(bound, "list users", state.store.list_users()).await?;

    let rows = join_requests(&requests, &users);
    let (data, pagination) = params.page_of(&rows);

    Ok(Json(RequestListResponse { data, pagination }))
}

/// `GET /requests/{kind}/stats` — Aggregate statistics for one kind.
///
/// # Errors
///
/// Returns [`ConsoleError::ValidationError`] for an unknown kind.
#[utoipa::path(
    get,
    path = "/api/v1/requests/{kind}/stats",
    tag = "Requests",
    summary = "Aggregate statistics for one request kind",
    description = "Recomputes the amount total and status counts from the full stored collection. The total sums every request's amount regardless of status.",
    params(
        ("kind" = String, Path, description = "Request kind"),
    ),
    responses(
        (status = 200, description = "Aggregate statistics", body = RequestStatsResponse),
        (status = 400, description = "Unknown request kind", body = ErrorResponse),
    )
)]
pub async fn request_stats(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, ConsoleError> {
    let kind = parse_kind(&kind)?;
    let requests = bounded(
        state.config.fetch_timeout(),
        "list requests",
        state.store.list_requests(kind),
    )
    .await?;

    Ok(Json(RequestStatsResponse {
        kind,
        stats: Aggregates::compute(&requests),
    }))
}

/// `GET /requests/{kind}/{id}` — Single request with resolved links.
///
/// # Errors
///
/// Returns [`ConsoleError::RequestNotFound`] if missing, or
/// [`ConsoleError::ValidationError`] when the record is of another kind.
#[utoipa::path(
    get,
    path = "/api/v1/requests/{kind}/{id}",
    tag = "Requests",
    summary = "Get a single request",
    description = "Returns the request joined with its owner, plus proof-of-payment and block explorer URLs for deposits that carry them.",
    params(
        ("kind" = String, Path, description = "Request kind"),
        ("id" = uuid::Uuid, Path, description = "Request UUID"),
    ),
    responses(
        (status = 200, description = "Request detail", body = RequestDetailResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, uuid::Uuid)>,
) -> Result<impl IntoResponse, ConsoleError> {
    let kind = parse_kind(&kind)?;
    let id = RequestId::from_uuid(id);
    let bound = state.config.fetch_timeout();

    let record = bounded(bound, "get request", state.store.get_request(id)).await?;
    if record.kind() != kind {
        return Err(ConsoleError::ValidationError(format!(
            "request {id} is a {}, not a {kind}",
            record.kind()
        )));
    }

    // Deleted owners degrade to the join fallback rather than a 404.
    let users = match bounded(bound, "get owning user", state.store.get_user(record.user_id)).await
    {
        Ok(user) => vec![user],
        Err(ConsoleError::UserNotFound(_)) => vec![],
        Err(error) => return Err(error),
    };

    let (proof_url, explorer_url) = match &record.details {
        RequestDetails::Deposit {
            method,
            proof_key,
            tx_hash,
        } => (
            proof_key
                .as_deref()
                .map(|key| links::proof_url(&state.config.proof_base_url, key)),
            tx_hash
                .as_deref()
                .and_then(|hash| links::explorer_url(hash, method)),
        ),
        _ => (None, None),
    };

    let mut rows = join_requests(std::slice::from_ref(&record), &users);
    let row = rows
        .pop()
        .ok_or_else(|| ConsoleError::Internal("join produced no row".to_string()))?;

    Ok(Json(RequestDetailResponse {
        row,
        proof_url,
        explorer_url,
    }))
}

/// `POST /requests/{kind}/{id}/decision` — Approve or reject a pending
/// request. Requires an admin bearer token.
///
/// # Errors
///
/// Returns [`ConsoleError::InvalidTransition`] when the request already
/// left pending, plus the not-found/validation errors of the lookup.
#[utoipa::path(
    post,
    path = "/api/v1/requests/{kind}/{id}/decision",
    tag = "Requests",
    summary = "Decide a pending request",
    description = "Applies an approve/reject decision. Settlement amounts are read from the stored record, never from the caller. A request settles exactly once; duplicate decisions return 409.",
    params(
        ("kind" = String, Path, description = "Request kind"),
        ("id" = uuid::Uuid, Path, description = "Request UUID"),
    ),
    request_body = Decision,
    responses(
        (status = 200, description = "Decision applied", body = DecisionResponse),
        (status = 403, description = "Missing or invalid admin token", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request already settled", body = ErrorResponse),
    )
)]
pub async fn decide_request(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path((kind, id)): Path<(String, uuid::Uuid)>,
    Json(decision): Json<Decision>,
) -> Result<impl IntoResponse, ConsoleError> {
    let kind = parse_kind(&kind)?;
    let id = RequestId::from_uuid(id);

    let record = bounded(
        state.config.fetch_timeout(),
        "get request",
        state.store.get_request(id),
    )
    .await?;
    if record.kind() != kind {
        return Err(ConsoleError::ValidationError(format!(
            "request {id} is a {}, not a {kind}",
            record.kind()
        )));
    }

    let outcome = state.approvals.decide(id, decision).await?;

    Ok(Json(DecisionResponse {
        request: outcome.request,
        new_balance: outcome.new_balance,
    }))
}

/// Request collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests/{kind}", get(list_requests))
        .route("/requests/{kind}/stats", get(request_stats))
        .route("/requests/{kind}/{id}", get(get_request))
        .route("/requests/{kind}/{id}/decision", post(decide_request))
}
