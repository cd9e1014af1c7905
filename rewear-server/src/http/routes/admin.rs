//! Moderation endpoints, admin only

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, patch},
    Json, Router,
};
use rewear_core::ItemStatus;
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::extractors::{AdminCaller, ValidId, ValidJson};
use crate::http::server::AppState;
use crate::models::{ItemWithOwner, MarketplaceStats, StatusUpdateRequest};

/// PATCH /api/admin/items/{id}/status response
#[derive(Serialize)]
pub struct ItemStatusResponse {
    pub message: &'static str,
    pub item: ItemWithOwner,
}

/// GET /api/admin/items/pending
async fn pending_items(
    State(state): State<Arc<AppState>>,
    _admin: AdminCaller,
) -> Result<Json<Vec<ItemWithOwner>>, ApiError> {
    Ok(Json(state.store.pending_items().await?))
}

/// PATCH /api/admin/items/{id}/status - approving pays the listing bonus
async fn update_item_status(
    State(state): State<Arc<AppState>>,
    AdminCaller(admin): AdminCaller,
    ValidId(id): ValidId,
    ValidJson(req): ValidJson<StatusUpdateRequest>,
) -> Result<Json<ItemStatusResponse>, ApiError> {
    let status: ItemStatus = req.status.trim().parse()?;
    let item = state.store.update_item_status(id, status).await?;

    tracing::info!(item_id = id, status = %status, admin_id = %admin.id, "item moderated");
    Ok(Json(ItemStatusResponse {
        message: "Item status updated",
        item,
    }))
}

/// GET /api/admin/stats
async fn stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminCaller,
) -> Result<Json<MarketplaceStats>, ApiError> {
    Ok(Json(state.store.stats().await?))
}

/// Admin routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/items/pending", get(pending_items))
        .route("/api/admin/items/{id}/status", patch(update_item_status))
        .route("/api/admin/stats", get(stats))
}
