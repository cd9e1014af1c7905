//! Swap endpoints
//!
//! Status changes go through the store's transition check; moving a swap to
//! `completed` settles it in the same store call. The owner (or an admin)
//! accepts and completes; the requester can only withdraw.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use rewear_core::{SwapActor, SwapStatus};
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::extractors::{Caller, ValidId, ValidJson, ValidQuery};
use crate::http::server::AppState;
use crate::models::{
    CreateSwapRequest, NewSwap, StatusUpdateRequest, Swap, SwapQuery, SwapWithDetails,
};

/// PATCH /api/swaps/{id}/status response
#[derive(Serialize)]
pub struct SwapStatusResponse {
    pub message: &'static str,
    pub swap: SwapWithDetails,
}

/// POST /api/swaps - request a swap on someone else's item
async fn create_swap(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidJson(req): ValidJson<CreateSwapRequest>,
) -> Result<(StatusCode, Json<Swap>), ApiError> {
    let swap = NewSwap::try_from(req)?;
    let swap = state.store.create_swap(caller.id(), swap).await?;

    tracing::info!(
        swap_id = swap.id,
        item_id = swap.item_id,
        swap_type = %swap.swap_type,
        "swap requested"
    );
    Ok((StatusCode::CREATED, Json(swap)))
}

/// GET /api/swaps?type=requested|received
async fn list_swaps(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidQuery(query): ValidQuery<SwapQuery>,
) -> Result<Json<Vec<SwapWithDetails>>, ApiError> {
    let filter = query.into_filter(caller.id())?;
    Ok(Json(state.store.list_swaps(filter).await?))
}

/// Load a swap together with the role the caller plays in it. Participants
/// act as themselves; admins only for swaps they are not part of.
async fn swap_for_caller(
    state: &AppState,
    caller: &Caller,
    id: i64,
) -> Result<(SwapWithDetails, SwapActor), ApiError> {
    let swap = state
        .store
        .get_swap(id)
        .await?
        .ok_or_else(|| ApiError::not_found("swap", id))?;

    let actor = if swap.swap.owner_id == caller.id() {
        SwapActor::Owner
    } else if swap.swap.requester_id == caller.id() {
        SwapActor::Requester
    } else {
        let is_admin = state
            .store
            .get_user(caller.id())
            .await?
            .is_some_and(|u| u.is_admin);
        if !is_admin {
            return Err(ApiError::forbidden("only swap participants may do this"));
        }
        SwapActor::Admin
    };

    Ok((swap, actor))
}

/// GET /api/swaps/{id}
async fn get_swap(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidId(id): ValidId,
) -> Result<Json<SwapWithDetails>, ApiError> {
    let (swap, _) = swap_for_caller(&state, &caller, id).await?;
    Ok(Json(swap))
}

/// PATCH /api/swaps/{id}/status
async fn update_swap_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidId(id): ValidId,
    ValidJson(req): ValidJson<StatusUpdateRequest>,
) -> Result<Json<SwapStatusResponse>, ApiError> {
    let status: SwapStatus = req.status.trim().parse()?;
    let (_, actor) = swap_for_caller(&state, &caller, id).await?;
    if !actor.may_set(status) {
        return Err(ApiError::forbidden(
            "only the item owner or an admin may accept or complete a swap",
        ));
    }

    let swap = state.store.update_swap_status(id, status).await?;
    tracing::info!(swap_id = id, status = %status, by = %caller.id(), "swap status updated");

    Ok(Json(SwapStatusResponse {
        message: "Swap status updated",
        swap,
    }))
}

/// Swap routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/swaps", get(list_swaps).post(create_swap))
        .route("/api/swaps/{id}", get(get_swap))
        .route("/api/swaps/{id}/status", patch(update_swap_status))
}
