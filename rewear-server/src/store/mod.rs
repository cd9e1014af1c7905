//! Marketplace storage
//!
//! `MarketplaceStore` is the seam between the HTTP layer and persistence.
//! Handlers hold an `Arc<dyn MarketplaceStore>`; production runs on
//! [`PgStore`], tests and demos on [`MemoryStore`].
//!
//! Every multi-step write (swap settlement, approval bonus) is atomic inside
//! a single store call: either all of its effects are visible or none are.

use async_trait::async_trait;
use rewear_core::{CoreError, ItemStatus, SwapStatus};
use thiserror::Error;

use crate::models::{
    Item, ItemFilter, ItemWithOwner, MarketplaceStats, NewItem, NewSwap, PointTransaction, Swap,
    SwapFilter, SwapWithDetails, User, UserClaims,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("swap cannot move from {from} to {to}")]
    InvalidTransition { from: SwapStatus, to: SwapStatus },

    #[error("insufficient points: {required} required, {available} available")]
    InsufficientPoints { required: i32, available: i32 },

    #[error("item {item_id} is not available for swaps")]
    ItemUnavailable { item_id: i64 },

    #[error("user '{given}' does not own item {item_id}")]
    OwnerMismatch { item_id: i64, given: String },

    #[error("cannot request a swap for your own item")]
    SelfSwap,

    #[error("email '{email}' is already registered to another user")]
    EmailTaken { email: String },

    /// Stored value outside the known vocabulary
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            CoreError::InsufficientPoints {
                required,
                available,
            } => Self::InsufficientPoints {
                required,
                available,
            },
            other => Self::Corrupt(other.to_string()),
        }
    }
}

/// Repository interface over users, items, swaps and the points ledger.
///
/// Lists are ordered newest first, ties broken by id descending.
#[async_trait]
pub trait MarketplaceStore: Send + Sync + 'static {
    // Users

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Insert with the starting grant, or refresh profile fields.
    /// Points and the admin flag are never touched by an upsert.
    async fn upsert_user(&self, claims: UserClaims) -> Result<User, StoreError>;

    async fn set_admin(&self, id: &str, is_admin: bool) -> Result<User, StoreError>;

    // Items

    /// New items start `pending` and available.
    async fn create_item(&self, owner_id: &str, item: NewItem) -> Result<Item, StoreError>;

    async fn get_item(&self, id: i64) -> Result<Option<ItemWithOwner>, StoreError>;

    async fn list_items(&self, filter: ItemFilter) -> Result<Vec<ItemWithOwner>, StoreError>;

    async fn list_user_items(&self, owner_id: &str) -> Result<Vec<Item>, StoreError>;

    /// Newest approved items, capped at the featured limit.
    async fn featured_items(&self) -> Result<Vec<ItemWithOwner>, StoreError>;

    async fn pending_items(&self) -> Result<Vec<ItemWithOwner>, StoreError> {
        self.list_items(ItemFilter::with_status(ItemStatus::Pending))
            .await
    }

    /// Moderate an item. Entering `approved` pays the owner the approval
    /// bonus in the same transaction.
    async fn update_item_status(
        &self,
        id: i64,
        status: ItemStatus,
    ) -> Result<ItemWithOwner, StoreError>;

    // Swaps

    async fn create_swap(&self, requester_id: &str, swap: NewSwap) -> Result<Swap, StoreError>;

    async fn get_swap(&self, id: i64) -> Result<Option<SwapWithDetails>, StoreError>;

    async fn list_swaps(&self, filter: SwapFilter) -> Result<Vec<SwapWithDetails>, StoreError>;

    /// Apply a status transition. Moving to `completed` settles the swap:
    /// points change hands for points swaps and the item leaves the market.
    async fn update_swap_status(
        &self,
        id: i64,
        status: SwapStatus,
    ) -> Result<SwapWithDetails, StoreError>;

    // Ledger

    async fn list_user_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PointTransaction>, StoreError>;

    async fn stats(&self) -> Result<MarketplaceStats, StoreError>;
}

/// Check the preconditions for `requester_id` opening a swap on `item`.
pub(crate) fn check_swap_request(
    item: &Item,
    requester_id: &str,
    requester_points: i32,
    swap: &NewSwap,
) -> Result<(), StoreError> {
    if let Some(ref given) = swap.expected_owner {
        if given != &item.user_id {
            return Err(StoreError::OwnerMismatch {
                item_id: item.id,
                given: given.clone(),
            });
        }
    }
    if item.user_id == requester_id {
        return Err(StoreError::SelfSwap);
    }
    if item.status != ItemStatus::Approved || !item.is_available {
        return Err(StoreError::ItemUnavailable { item_id: item.id });
    }
    if swap.swap_type == rewear_core::SwapType::Points && requester_points < item.point_value {
        return Err(StoreError::InsufficientPoints {
            required: item.point_value,
            available: requester_points,
        });
    }
    Ok(())
}
