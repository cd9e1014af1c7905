//! Current-user endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::http::error::ApiError;
use crate::http::extractors::{Caller, ValidJson};
use crate::http::server::AppState;
use crate::models::{UpsertUserRequest, User, UserClaims};

/// GET /api/auth/user - the caller's stored record
async fn current_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .get_user(caller.id())
        .await?
        .ok_or_else(|| ApiError::not_found("user", caller.id()))?;

    Ok(Json(user))
}

/// PUT /api/auth/user - create or refresh the caller from identity claims
async fn sync_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidJson(req): ValidJson<UpsertUserRequest>,
) -> Result<Json<User>, ApiError> {
    let claims = UserClaims::new(caller.id(), req)?;
    let user = state.store.upsert_user(claims).await?;
    tracing::debug!(user_id = %user.id, "user synced");
    Ok(Json(user))
}

/// Auth routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/user", get(current_user).put(sync_user))
}
