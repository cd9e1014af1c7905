//! In-memory store
//!
//! All state sits behind one async mutex, so every operation sees and leaves
//! a consistent snapshot. Used by router tests and `rewear serve --in-memory`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rewear_core::{
    approval_bonus, ItemStatus, LedgerEntry, MarketplaceRules, SettlementPlan, SwapStatus,
    SwapTerms, TransactionKind,
};
use tokio::sync::Mutex;

use super::{check_swap_request, MarketplaceStore, StoreError};
use crate::models::{
    Item, ItemFilter, ItemWithOwner, MarketplaceStats, NewItem, NewSwap, PointTransaction, Swap,
    SwapFilter, SwapWithDetails, User, UserClaims,
};

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    items: BTreeMap<i64, Item>,
    swaps: BTreeMap<i64, Swap>,
    ledger: Vec<PointTransaction>,
    next_item_id: i64,
    next_swap_id: i64,
    next_tx_id: i64,
}

impl State {
    fn user(&self, id: &str) -> Result<&User, StoreError> {
        self.users
            .get(id)
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    fn with_owner(&self, item: &Item) -> Result<ItemWithOwner, StoreError> {
        Ok(ItemWithOwner {
            item: item.clone(),
            user: self.user(&item.user_id)?.clone(),
        })
    }

    fn details(&self, swap: &Swap) -> Result<SwapWithDetails, StoreError> {
        let item = self
            .items
            .get(&swap.item_id)
            .ok_or_else(|| StoreError::not_found("item", swap.item_id))?;

        Ok(SwapWithDetails {
            swap: swap.clone(),
            requester: self.user(&swap.requester_id)?.clone(),
            owner: self.user(&swap.owner_id)?.clone(),
            item: self.with_owner(item)?,
        })
    }

    /// Credit or debit a balance and append the matching ledger row.
    fn apply(&mut self, entry: LedgerEntry) -> Result<(), StoreError> {
        let now = Utc::now();
        let user = self
            .users
            .get_mut(&entry.user_id)
            .ok_or_else(|| StoreError::not_found("user", &entry.user_id))?;
        user.points += entry.amount;
        user.updated_at = now;

        self.next_tx_id += 1;
        self.ledger.push(PointTransaction {
            id: self.next_tx_id,
            user_id: entry.user_id,
            amount: entry.amount,
            kind: entry.kind,
            description: Some(entry.description),
            related_item_id: entry.related_item_id,
            created_at: now,
        });
        Ok(())
    }

    fn bonus_paid(&self, item_id: i64) -> bool {
        self.ledger
            .iter()
            .any(|t| t.kind == TransactionKind::Bonus && t.related_item_id == Some(item_id))
    }

    fn items_matching(&self, filter: &ItemFilter) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().filter(|i| filter.matches(i)).collect();
        items.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        if let Some(limit) = filter.limit {
            items.truncate(limit as usize);
        }
        items
    }
}

pub struct MemoryStore {
    state: Mutex<State>,
    rules: MarketplaceRules,
}

impl MemoryStore {
    pub fn new(rules: MarketplaceRules) -> Self {
        Self {
            state: Mutex::new(State::default()),
            rules,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MarketplaceRules::default())
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn upsert_user(&self, claims: UserClaims) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;

        if let Some(ref email) = claims.email {
            let taken = state
                .users
                .values()
                .any(|u| u.id != claims.id && u.email.as_deref() == Some(email.as_str()));
            if taken {
                return Err(StoreError::EmailTaken {
                    email: email.clone(),
                });
            }
        }

        let now = Utc::now();
        let starting_points = self.rules.starting_points;
        let user = state
            .users
            .entry(claims.id.clone())
            .and_modify(|u| {
                u.email = claims.email.clone();
                u.first_name = claims.first_name.clone();
                u.last_name = claims.last_name.clone();
                u.profile_image_url = claims.profile_image_url.clone();
                u.updated_at = now;
            })
            .or_insert_with(|| User {
                id: claims.id.clone(),
                email: claims.email.clone(),
                first_name: claims.first_name.clone(),
                last_name: claims.last_name.clone(),
                profile_image_url: claims.profile_image_url.clone(),
                points: starting_points,
                is_admin: false,
                created_at: now,
                updated_at: now,
            });

        Ok(user.clone())
    }

    async fn set_admin(&self, id: &str, is_admin: bool) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user.is_admin = is_admin;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn create_item(&self, owner_id: &str, item: NewItem) -> Result<Item, StoreError> {
        let mut state = self.state.lock().await;
        state.user(owner_id)?;

        state.next_item_id += 1;
        let now = Utc::now();
        let item = Item {
            id: state.next_item_id,
            user_id: owner_id.to_owned(),
            title: item.title,
            description: item.description,
            category: item.category,
            size: item.size,
            condition: item.condition,
            brand: item.brand,
            point_value: item.point_value,
            tags: item.tags,
            images: item.images,
            status: ItemStatus::Pending,
            is_available: true,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: i64) -> Result<Option<ItemWithOwner>, StoreError> {
        let state = self.state.lock().await;
        state
            .items
            .get(&id)
            .map(|item| state.with_owner(item))
            .transpose()
    }

    async fn list_items(&self, filter: ItemFilter) -> Result<Vec<ItemWithOwner>, StoreError> {
        let state = self.state.lock().await;
        state
            .items_matching(&filter)
            .into_iter()
            .map(|item| state.with_owner(item))
            .collect()
    }

    async fn list_user_items(&self, owner_id: &str) -> Result<Vec<Item>, StoreError> {
        let state = self.state.lock().await;
        let filter = ItemFilter {
            owner_id: Some(owner_id.to_owned()),
            ..Default::default()
        };
        Ok(state.items_matching(&filter).into_iter().cloned().collect())
    }

    async fn featured_items(&self) -> Result<Vec<ItemWithOwner>, StoreError> {
        self.list_items(ItemFilter {
            limit: Some(self.rules.featured_limit),
            ..ItemFilter::with_status(ItemStatus::Approved)
        })
        .await
    }

    async fn update_item_status(
        &self,
        id: i64,
        status: ItemStatus,
    ) -> Result<ItemWithOwner, StoreError> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("item", id))?;

        let previous = item.status;
        item.status = status;
        item.updated_at = Utc::now();
        let (owner_id, title) = (item.user_id.clone(), item.title.clone());

        let bonus = self.rules.approval_bonus;
        if ItemStatus::earns_bonus(previous, status) && bonus > 0 && !state.bonus_paid(id) {
            state.apply(approval_bonus(&owner_id, id, &title, bonus))?;
            tracing::info!(
                item_id = id,
                owner_id = %owner_id,
                amount = bonus,
                "approval bonus paid"
            );
        }

        let item = state
            .items
            .get(&id)
            .ok_or_else(|| StoreError::not_found("item", id))?;
        state.with_owner(item)
    }

    async fn create_swap(&self, requester_id: &str, swap: NewSwap) -> Result<Swap, StoreError> {
        let mut state = self.state.lock().await;
        let requester_points = state.user(requester_id)?.points;
        let item = state
            .items
            .get(&swap.item_id)
            .ok_or_else(|| StoreError::not_found("item", swap.item_id))?;

        check_swap_request(item, requester_id, requester_points, &swap)?;
        let owner_id = item.user_id.clone();

        state.next_swap_id += 1;
        let now = Utc::now();
        let created = Swap {
            id: state.next_swap_id,
            requester_id: requester_id.to_owned(),
            owner_id,
            item_id: swap.item_id,
            swap_type: swap.swap_type,
            status: SwapStatus::Pending,
            message: swap.message,
            created_at: now,
            updated_at: now,
        };
        state.swaps.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_swap(&self, id: i64) -> Result<Option<SwapWithDetails>, StoreError> {
        let state = self.state.lock().await;
        state
            .swaps
            .get(&id)
            .map(|swap| state.details(swap))
            .transpose()
    }

    async fn list_swaps(&self, filter: SwapFilter) -> Result<Vec<SwapWithDetails>, StoreError> {
        let state = self.state.lock().await;
        let mut swaps: Vec<&Swap> = state.swaps.values().filter(|s| filter.matches(s)).collect();
        swaps.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        swaps.into_iter().map(|s| state.details(s)).collect()
    }

    async fn update_swap_status(
        &self,
        id: i64,
        status: SwapStatus,
    ) -> Result<SwapWithDetails, StoreError> {
        let mut state = self.state.lock().await;
        let swap = state
            .swaps
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("swap", id))?;

        let next = swap.status.transition_to(status)?;

        // Validate everything before the first write so a refusal changes nothing.
        if next == SwapStatus::Completed {
            let item = state
                .items
                .get(&swap.item_id)
                .ok_or_else(|| StoreError::not_found("item", swap.item_id))?;
            if !item.is_available || item.status != ItemStatus::Approved {
                return Err(StoreError::ItemUnavailable { item_id: item.id });
            }

            let plan = SettlementPlan::for_completion(&SwapTerms {
                swap_type: swap.swap_type,
                requester_id: &swap.requester_id,
                owner_id: &swap.owner_id,
                item_id: item.id,
                item_title: &item.title,
                point_value: item.point_value,
            });
            let balance = state.user(&swap.requester_id)?.points;
            plan.check_funds(&swap.requester_id, balance)?;
            state.user(&swap.owner_id)?;

            let amount = plan.required_from(&swap.requester_id);
            for entry in plan.entries {
                state.apply(entry)?;
            }
            if let Some(item) = state.items.get_mut(&plan.item_id) {
                item.is_available = false;
                item.updated_at = Utc::now();
            }
            tracing::info!(swap_id = id, item_id = plan.item_id, amount, "swap settled");
        }

        let stored = state
            .swaps
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("swap", id))?;
        stored.status = next;
        stored.updated_at = Utc::now();
        let swap = stored.clone();

        state.details(&swap)
    }

    async fn list_user_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PointTransaction>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<PointTransaction> = state
            .ledger
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn stats(&self) -> Result<MarketplaceStats, StoreError> {
        let state = self.state.lock().await;
        Ok(MarketplaceStats {
            total_users: state.users.len() as i64,
            total_items: state.items.len() as i64,
            total_swaps: state.swaps.len() as i64,
            pending_items: state
                .items
                .values()
                .filter(|i| i.status == ItemStatus::Pending)
                .count() as i64,
        })
    }
}
