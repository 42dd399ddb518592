//! REST endpoint handlers organized by resource.

pub mod requests;
pub mod system;
pub mod users;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(requests::routes())
        .merge(users::routes())
        .merge(system::api_routes())
}
