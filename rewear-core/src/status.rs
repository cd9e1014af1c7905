//! Status vocabularies for items, swaps and ledger entries
//!
//! Every value is stored as lowercase text in the database and travels as the
//! same lowercase string over JSON. Parsing is strict: anything outside the
//! vocabulary is a `CoreError::UnknownVariant`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Moderation state of a listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a move may pay the listing bonus: only on entering `approved`.
    /// Stores also skip items whose bonus is already in the ledger, so an
    /// item that is rejected and approved again pays nothing more.
    pub fn earns_bonus(from: ItemStatus, to: ItemStatus) -> bool {
        to == Self::Approved && from != Self::Approved
    }
}

impl FromStr for ItemStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(CoreError::unknown_variant("item status", other)),
        }
    }
}

/// How a swap is paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapType {
    /// Item-for-item exchange, no points move
    Direct,
    /// Requester redeems the item for its point value
    Points,
}

impl SwapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Points => "points",
        }
    }
}

impl FromStr for SwapType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "points" => Ok(Self::Points),
            other => Err(CoreError::unknown_variant("swap type", other)),
        }
    }
}

/// Lifecycle of a swap request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// Transition table:
    ///
    /// ```text
    /// pending  -> accepted | rejected
    /// accepted -> completed | rejected
    /// ```
    pub fn can_transition_to(&self, next: SwapStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Rejected)
                | (Self::Accepted, Self::Completed)
                | (Self::Accepted, Self::Rejected)
        )
    }

    /// Validate a move to `next`, returning the new status.
    pub fn transition_to(self, next: SwapStatus) -> Result<SwapStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

/// The role a caller plays when changing a swap's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapActor {
    Requester,
    Owner,
    /// Moderator acting on a swap they take no part in
    Admin,
}

impl SwapActor {
    /// Owners and admins drive the swap; a requester may only withdraw.
    pub fn may_set(&self, next: SwapStatus) -> bool {
        match self {
            Self::Owner | Self::Admin => true,
            Self::Requester => next == SwapStatus::Rejected,
        }
    }
}

impl FromStr for SwapStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            other => Err(CoreError::unknown_variant("swap status", other)),
        }
    }
}

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Earned,
    Spent,
    Bonus,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Spent => "spent",
            Self::Bonus => "bonus",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earned" => Ok(Self::Earned),
            "spent" => Ok(Self::Spent),
            "bonus" => Ok(Self::Bonus),
            other => Err(CoreError::unknown_variant("transaction type", other)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(ItemStatus, SwapType, SwapStatus, TransactionKind);
