//! rewear-core: marketplace rules shared by the server and the CLI
//!
//! Holds the pieces of the clothing exchange that do not touch a database:
//! - status vocabularies and the swap transition table
//! - settlement planning (who gains or loses points when a swap completes)
//! - configuration loading

pub mod config;
pub mod error;
pub mod settlement;
pub mod status;

pub use config::{DatabaseConfig, MarketplaceRules, RewearConfig, ServerSection};
pub use error::{CoreError, Result};
pub use settlement::{approval_bonus, LedgerEntry, SettlementPlan, SwapTerms};
pub use status::{ItemStatus, SwapActor, SwapStatus, SwapType, TransactionKind};
