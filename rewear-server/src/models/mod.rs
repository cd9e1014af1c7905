//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod entities;
pub mod filters;
pub mod requests;
pub mod validation;

pub use entities::{
    Item, ItemWithOwner, MarketplaceStats, PointTransaction, Swap, SwapWithDetails, User,
};
pub use filters::{ItemFilter, ItemQuery, ListLimit, SwapDirection, SwapFilter, SwapQuery};
pub use requests::{
    CreateItemRequest, CreateSwapRequest, NewItem, NewSwap, StatusUpdateRequest,
    UpsertUserRequest, UserClaims,
};
pub use validation::ValidationError;
