//! Points ledger endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::http::error::ApiError;
use crate::http::extractors::Caller;
use crate::http::server::AppState;
use crate::models::PointTransaction;

/// GET /api/users/{user_id}/transactions - the caller's ledger, newest first
async fn user_transactions(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<PointTransaction>>, ApiError> {
    caller.ensure_self(&user_id)?;
    Ok(Json(state.store.list_user_transactions(&user_id).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/users/{user_id}/transactions", get(user_transactions))
}
