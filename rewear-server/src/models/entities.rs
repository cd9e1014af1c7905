//! Stored records and their hydrated read models
//!
//! Field names serialize as camelCase to match the JSON API.

use chrono::{DateTime, Utc};
use rewear_core::{ItemStatus, SwapStatus, SwapType, TransactionKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub points: i32,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    /// Owner
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub size: String,
    pub condition: String,
    pub brand: Option<String>,
    pub point_value: i32,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub status: ItemStatus,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item plus its owner, serialized as the item's fields with a `user` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemWithOwner {
    #[serde(flatten)]
    pub item: Item,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub id: i64,
    pub requester_id: String,
    pub owner_id: String,
    pub item_id: i64,
    pub swap_type: SwapType,
    pub status: SwapStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Swap {
    pub fn involves(&self, user_id: &str) -> bool {
        self.requester_id == user_id || self.owner_id == user_id
    }
}

/// Swap with both parties and the item hydrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapWithDetails {
    #[serde(flatten)]
    pub swap: Swap,
    pub requester: User,
    pub owner: User,
    pub item: ItemWithOwner,
}

/// Ledger row. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointTransaction {
    pub id: i64,
    pub user_id: String,
    pub amount: i32,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub related_item_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceStats {
    pub total_users: i64,
    pub total_items: i64,
    pub total_swaps: i64,
    pub pending_items: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        let now = Utc::now();
        User {
            id: id.into(),
            email: None,
            first_name: Some("Ada".into()),
            last_name: None,
            profile_image_url: None,
            points: 100,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn item_with_owner_flattens() {
        let now = Utc::now();
        let owned = ItemWithOwner {
            item: Item {
                id: 1,
                user_id: "u1".into(),
                title: "Coat".into(),
                description: None,
                category: "outerwear".into(),
                size: "M".into(),
                condition: "good".into(),
                brand: None,
                point_value: 40,
                tags: vec![],
                images: vec![],
                status: ItemStatus::Approved,
                is_available: true,
                created_at: now,
                updated_at: now,
            },
            user: user("u1"),
        };

        let json = serde_json::to_value(&owned).unwrap();
        assert_eq!(json["pointValue"], 40);
        assert_eq!(json["isAvailable"], true);
        assert_eq!(json["status"], "approved");
        assert_eq!(json["user"]["firstName"], "Ada");
        assert!(json.get("item").is_none());
    }

    #[test]
    fn transaction_kind_serializes_as_type() {
        let tx = PointTransaction {
            id: 1,
            user_id: "u1".into(),
            amount: -5,
            kind: TransactionKind::Spent,
            description: Some("Redeemed Coat".into()),
            related_item_id: Some(3),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "spent");
        assert_eq!(json["relatedItemId"], 3);
    }
}
