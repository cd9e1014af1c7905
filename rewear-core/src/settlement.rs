//! Settlement planning
//!
//! A completed swap turns into a list of ledger entries. Each entry's amount
//! is added to the named user's balance and appended to the ledger, so the
//! balance change and the ledger always agree. Stores apply a plan inside a
//! single transaction.

use crate::error::CoreError;
use crate::status::{SwapType, TransactionKind};

/// The facts about a swap that settlement needs
#[derive(Debug, Clone, Copy)]
pub struct SwapTerms<'a> {
    pub swap_type: SwapType,
    pub requester_id: &'a str,
    pub owner_id: &'a str,
    pub item_id: i64,
    pub item_title: &'a str,
    pub point_value: i32,
}

/// One balance change plus the ledger row that records it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: String,
    pub amount: i32,
    pub kind: TransactionKind,
    pub description: String,
    pub related_item_id: Option<i64>,
}

/// Side effects of completing a swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    /// Item that becomes unavailable
    pub item_id: i64,
    /// Ledger entries in application order (debit first)
    pub entries: Vec<LedgerEntry>,
}

impl SettlementPlan {
    /// Plan the completion of a swap.
    ///
    /// Direct swaps move no points; points swaps debit the requester and credit
    /// the owner by the item's point value. Either way the item is taken off
    /// the market.
    pub fn for_completion(terms: &SwapTerms<'_>) -> Self {
        let entries = match terms.swap_type {
            SwapType::Direct => Vec::new(),
            SwapType::Points => vec![
                LedgerEntry {
                    user_id: terms.requester_id.to_owned(),
                    amount: -terms.point_value,
                    kind: TransactionKind::Spent,
                    description: format!("Redeemed {}", terms.item_title),
                    related_item_id: Some(terms.item_id),
                },
                LedgerEntry {
                    user_id: terms.owner_id.to_owned(),
                    amount: terms.point_value,
                    kind: TransactionKind::Earned,
                    description: format!("Earned from {}", terms.item_title),
                    related_item_id: Some(terms.item_id),
                },
            ],
        };

        Self {
            item_id: terms.item_id,
            entries,
        }
    }

    /// Points the requester must hold for the plan to apply.
    pub fn required_from(&self, user_id: &str) -> i32 {
        self.entries
            .iter()
            .filter(|e| e.user_id == user_id && e.amount < 0)
            .map(|e| -e.amount)
            .sum()
    }

    /// Refuse the plan when `balance` cannot cover what `user_id` pays.
    pub fn check_funds(&self, user_id: &str, balance: i32) -> Result<(), CoreError> {
        let required = self.required_from(user_id);
        if required > balance {
            return Err(CoreError::InsufficientPoints {
                required,
                available: balance,
            });
        }
        Ok(())
    }

    /// Sum of all amounts; zero for every settlement.
    pub fn net_change(&self) -> i64 {
        self.entries.iter().map(|e| i64::from(e.amount)).sum()
    }

    pub fn moves_points(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// Ledger entry paid to an owner when an admin approves their listing.
pub fn approval_bonus(owner_id: &str, item_id: i64, item_title: &str, bonus: i32) -> LedgerEntry {
    LedgerEntry {
        user_id: owner_id.to_owned(),
        amount: bonus,
        kind: TransactionKind::Bonus,
        description: format!("Bonus for listing {}", item_title),
        related_item_id: Some(item_id),
    }
}
