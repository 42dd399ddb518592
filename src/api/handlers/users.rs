//! User management handlers: listing, fund adjustments, deletion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::auth::AdminAuth;
use crate::api::dto::{
    AdjustFundsRequest, NotificationListResponse, PaginationParams, UserListResponse,
};
use crate::app_state::AppState;
use crate::domain::{ChangeEvent, EntityKind, User, UserId};
use crate::error::{ConsoleError, ErrorResponse};
use crate::service::bounded;

/// `GET /users` — List all users.
///
/// # Errors
///
/// Returns [`ConsoleError::PersistenceError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    summary = "List users",
    description = "Returns a paginated list of all platform users with their balances, roles, and KYC status.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ConsoleError> {
    let users = bounded(
        state.config.fetch_timeout(),
        "list users",
        state.store.list_users(),
    )
    .await?;
    let (data, pagination) = params.page_of(&users);
    Ok(Json(UserListResponse { data, pagination }))
}

/// `POST /users/{id}/balance` — Adjust a user's balance by a signed
/// delta. Requires an admin bearer token.
///
/// # Errors
///
/// Returns [`ConsoleError::InsufficientFunds`] when a removal exceeds
/// the current balance.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/balance",
    tag = "Users",
    summary = "Adjust a user's balance",
    description = "Applies a signed delta to the balance. A durable audit notification recording the old and new amount is written as part of the mutation.",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    request_body = AdjustFundsRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 403, description = "Missing or invalid admin token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 422, description = "Removal exceeds available funds", body = ErrorResponse),
    )
)]
pub async fn adjust_balance(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<AdjustFundsRequest>,
) -> Result<impl IntoResponse, ConsoleError> {
    let note = req.note.as_deref().unwrap_or("manual adjustment");
    let user = state
        .ledger
        .adjust_balance(UserId::from_uuid(id), req.delta, note)
        .await?;
    Ok(Json(user))
}

/// `POST /users/{id}/bonus` — Adjust a user's bonus by a signed delta.
/// Requires an admin bearer token.
///
/// # Errors
///
/// Returns [`ConsoleError::InsufficientFunds`] when a removal exceeds
/// the current bonus.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/bonus",
    tag = "Users",
    summary = "Adjust a user's bonus",
    description = "Applies a signed delta to the bonus fund, with the same audit trail and non-negativity check as balance adjustments.",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    request_body = AdjustFundsRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 403, description = "Missing or invalid admin token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 422, description = "Removal exceeds available funds", body = ErrorResponse),
    )
)]
pub async fn adjust_bonus(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<AdjustFundsRequest>,
) -> Result<impl IntoResponse, ConsoleError> {
    let note = req.note.as_deref().unwrap_or("manual adjustment");
    let user = state
        .ledger
        .adjust_bonus(UserId::from_uuid(id), req.delta, note)
        .await?;
    Ok(Json(user))
}

/// `POST /users/{id}/bonus/convert` — Move the entire bonus into the
/// balance. Requires an admin bearer token.
///
/// # Errors
///
/// Returns [`ConsoleError::NothingToConvert`] when the bonus is zero.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/bonus/convert",
    tag = "Users",
    summary = "Convert a user's bonus into balance",
    description = "Single persisted mutation: balance += bonus, bonus = 0. A zero bonus is reported as a conflict, not silently ignored.",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 403, description = "Missing or invalid admin token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Nothing to convert", body = ErrorResponse),
    )
)]
pub async fn convert_bonus(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ConsoleError> {
    let user = state.ledger.convert_bonus(UserId::from_uuid(id)).await?;
    Ok(Json(user))
}

/// `DELETE /users/{id}` — Remove a user. Requires an admin bearer token.
///
/// The user's requests are kept; their rows fall back to the
/// `"Unknown User"` join display.
///
/// # Errors
///
/// Returns [`ConsoleError::UserNotFound`] if the user does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    summary = "Delete a user",
    description = "Removes the user record. Their request history remains and joins against the Unknown User fallback.",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Missing or invalid admin token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ConsoleError> {
    let id = UserId::from_uuid(id);
    bounded(
        state.config.fetch_timeout(),
        "delete user",
        state.store.delete_user(id),
    )
    .await?;
    let _ = state.event_bus.publish(ChangeEvent::now(EntityKind::Users));
    tracing::info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/{id}/notifications` — A user's in-app notifications.
///
/// # Errors
///
/// Returns [`ConsoleError::PersistenceError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/notifications",
    tag = "Users",
    summary = "List a user's notifications",
    description = "Returns the user's in-app notifications, newest first, including the ledger audit messages.",
    params(
        ("id" = uuid::Uuid, Path, description = "User UUID"),
    ),
    responses(
        (status = 200, description = "Notification list", body = NotificationListResponse),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, ConsoleError> {
    let data = bounded(
        state.config.fetch_timeout(),
        "list notifications",
        state.store.list_notifications(UserId::from_uuid(id)),
    )
    .await?;
    Ok(Json(NotificationListResponse { data }))
}

/// User management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/balance", post(adjust_balance))
        .route("/users/{id}/bonus", post(adjust_bonus))
        .route("/users/{id}/bonus/convert", post(convert_bonus))
        .route("/users/{id}/notifications", get(list_notifications))
}
