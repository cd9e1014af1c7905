//! Item listing endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::http::error::ApiError;
use crate::http::extractors::{Caller, ValidId, ValidJson, ValidQuery};
use crate::http::server::AppState;
use crate::models::{CreateItemRequest, Item, ItemFilter, ItemQuery, ItemWithOwner, NewItem};

/// POST /api/items - list a new item owned by the caller
async fn create_item(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidJson(req): ValidJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = NewItem::try_from(req)?;
    let item = state.store.create_item(caller.id(), item).await?;

    tracing::info!(item_id = item.id, owner_id = %item.user_id, "item listed");
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/items - browse with status, category, search and limit
async fn list_items(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ItemQuery>,
) -> Result<Json<Vec<ItemWithOwner>>, ApiError> {
    let filter = ItemFilter::try_from(query)?;
    Ok(Json(state.store.list_items(filter).await?))
}

/// GET /api/items/featured
async fn featured_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ItemWithOwner>>, ApiError> {
    Ok(Json(state.store.featured_items().await?))
}

/// GET /api/items/{id}
async fn get_item(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<ItemWithOwner>, ApiError> {
    let item = state
        .store
        .get_item(id)
        .await?
        .ok_or_else(|| ApiError::not_found("item", id))?;
    Ok(Json(item))
}

/// GET /api/users/{user_id}/items - the caller's own listings, any status
async fn user_items(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Item>>, ApiError> {
    caller.ensure_self(&user_id)?;
    Ok(Json(state.store.list_user_items(&user_id).await?))
}

/// Item routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/items/featured", get(featured_items))
        .route("/api/items/{id}", get(get_item))
        .route("/api/users/{user_id}/items", get(user_items))
}
