//! PostgreSQL store
//!
//! Patterns:
//! - related entities hydrated with JOINs in one query (no N+1)
//! - filtered lists built with `QueryBuilder`, every value bound
//! - settlement and approval bonus run in one transaction, with the swap or
//!   item row locked (`FOR UPDATE`) before its status is checked

use std::str::FromStr;

use async_trait::async_trait;
use rewear_core::{
    approval_bonus, CoreError, ItemStatus, LedgerEntry, MarketplaceRules, SettlementPlan,
    SwapStatus, SwapTerms, SwapType,
};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};

use super::{check_swap_request, MarketplaceStore, StoreError};
use crate::models::{
    Item, ItemFilter, ItemWithOwner, MarketplaceStats, NewItem, NewSwap, PointTransaction, Swap,
    SwapFilter, SwapWithDetails, User, UserClaims,
};

const USER_FIELDS: &[&str] = &[
    "id",
    "email",
    "first_name",
    "last_name",
    "profile_image_url",
    "points",
    "is_admin",
    "created_at",
    "updated_at",
];

const ITEM_FIELDS: &[&str] = &[
    "id",
    "user_id",
    "title",
    "description",
    "category",
    "size",
    "condition",
    "brand",
    "point_value",
    "tags",
    "images",
    "status",
    "is_available",
    "created_at",
    "updated_at",
];

const SWAP_FIELDS: &[&str] = &[
    "id",
    "requester_id",
    "owner_id",
    "item_id",
    "swap_type",
    "status",
    "message",
    "created_at",
    "updated_at",
];

/// `t.col AS pcol, ...` for every field
fn select_list(fields: &[&str], table: &str, prefix: &str) -> String {
    fields
        .iter()
        .map(|f| format!("{table}.{f} AS {prefix}{f}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn item_select() -> String {
    format!(
        "SELECT {}, {} FROM items i JOIN users u ON u.id = i.user_id",
        select_list(ITEM_FIELDS, "i", "i_"),
        select_list(USER_FIELDS, "u", "u_"),
    )
}

fn swap_select() -> String {
    format!(
        "SELECT {}, {}, {}, {} FROM swaps s \
         JOIN users r ON r.id = s.requester_id \
         JOIN users o ON o.id = s.owner_id \
         JOIN items i ON i.id = s.item_id",
        select_list(SWAP_FIELDS, "s", "s_"),
        select_list(USER_FIELDS, "r", "r_"),
        select_list(USER_FIELDS, "o", "o_"),
        select_list(ITEM_FIELDS, "i", "i_"),
    )
}

/// Decode a text column into one of the core vocabularies.
fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = CoreError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: CoreError| sqlx::Error::Decode(Box::new(e)))
}

fn user_from_row(row: &PgRow, prefix: &str) -> Result<User, sqlx::Error> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(User {
        id: row.try_get(col("id").as_str())?,
        email: row.try_get(col("email").as_str())?,
        first_name: row.try_get(col("first_name").as_str())?,
        last_name: row.try_get(col("last_name").as_str())?,
        profile_image_url: row.try_get(col("profile_image_url").as_str())?,
        points: row.try_get(col("points").as_str())?,
        is_admin: row.try_get(col("is_admin").as_str())?,
        created_at: row.try_get(col("created_at").as_str())?,
        updated_at: row.try_get(col("updated_at").as_str())?,
    })
}

fn item_from_row(row: &PgRow, prefix: &str) -> Result<Item, sqlx::Error> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Item {
        id: row.try_get(col("id").as_str())?,
        user_id: row.try_get(col("user_id").as_str())?,
        title: row.try_get(col("title").as_str())?,
        description: row.try_get(col("description").as_str())?,
        category: row.try_get(col("category").as_str())?,
        size: row.try_get(col("size").as_str())?,
        condition: row.try_get(col("condition").as_str())?,
        brand: row.try_get(col("brand").as_str())?,
        point_value: row.try_get(col("point_value").as_str())?,
        tags: row.try_get(col("tags").as_str())?,
        images: row.try_get(col("images").as_str())?,
        status: parse_column(row, &col("status"))?,
        is_available: row.try_get(col("is_available").as_str())?,
        created_at: row.try_get(col("created_at").as_str())?,
        updated_at: row.try_get(col("updated_at").as_str())?,
    })
}

fn swap_from_row(row: &PgRow, prefix: &str) -> Result<Swap, sqlx::Error> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Swap {
        id: row.try_get(col("id").as_str())?,
        requester_id: row.try_get(col("requester_id").as_str())?,
        owner_id: row.try_get(col("owner_id").as_str())?,
        item_id: row.try_get(col("item_id").as_str())?,
        swap_type: parse_column(row, &col("swap_type"))?,
        status: parse_column(row, &col("status"))?,
        message: row.try_get(col("message").as_str())?,
        created_at: row.try_get(col("created_at").as_str())?,
        updated_at: row.try_get(col("updated_at").as_str())?,
    })
}

fn item_with_owner_from_row(row: &PgRow) -> Result<ItemWithOwner, sqlx::Error> {
    Ok(ItemWithOwner {
        item: item_from_row(row, "i_")?,
        user: user_from_row(row, "u_")?,
    })
}

fn swap_details_from_row(row: &PgRow) -> Result<SwapWithDetails, sqlx::Error> {
    let owner = user_from_row(row, "o_")?;
    Ok(SwapWithDetails {
        swap: swap_from_row(row, "s_")?,
        requester: user_from_row(row, "r_")?,
        item: ItemWithOwner {
            item: item_from_row(row, "i_")?,
            user: owner.clone(),
        },
        owner,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<PointTransaction, sqlx::Error> {
    Ok(PointTransaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        kind: parse_column(row, "type")?,
        description: row.try_get("description")?,
        related_item_id: row.try_get("related_item_id")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Escape `%`, `_` and `\` so user text matches literally inside ILIKE.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Apply one balance change and append its ledger row.
async fn apply_entry(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<(), StoreError> {
    let updated = sqlx::query(
        "UPDATE users SET points = points + $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(&entry.user_id)
    .bind(entry.amount)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(StoreError::not_found("user", &entry.user_id));
    }

    sqlx::query(
        r#"
        INSERT INTO point_transactions (user_id, amount, type, description, related_item_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&entry.user_id)
    .bind(entry.amount)
    .bind(entry.kind.as_str())
    .bind(&entry.description)
    .bind(entry.related_item_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|d| d.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|d| d.is_foreign_key_violation())
}

/// Production store over a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    rules: MarketplaceRules,
}

impl PgStore {
    pub fn new(pool: PgPool, rules: MarketplaceRules) -> Self {
        Self { pool, rules }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_FIELDS.join(", "));
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| user_from_row(&r, "")).transpose()?)
    }

    async fn upsert_user(&self, claims: UserClaims) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, first_name, last_name, profile_image_url, points)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                profile_image_url = EXCLUDED.profile_image_url,
                updated_at = NOW()
            RETURNING {}
            "#,
            USER_FIELDS.join(", ")
        );

        let row = sqlx::query(&sql)
            .bind(&claims.id)
            .bind(&claims.email)
            .bind(&claims.first_name)
            .bind(&claims.last_name)
            .bind(&claims.profile_image_url)
            .bind(self.rules.starting_points)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::EmailTaken {
                        email: claims.email.clone().unwrap_or_default(),
                    }
                } else {
                    StoreError::Database(e)
                }
            })?;

        Ok(user_from_row(&row, "")?)
    }

    async fn set_admin(&self, id: &str, is_admin: bool) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET is_admin = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_FIELDS.join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(is_admin)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))?;

        Ok(user_from_row(&row, "")?)
    }

    async fn create_item(&self, owner_id: &str, item: NewItem) -> Result<Item, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO items
                (user_id, title, description, category, size, condition, brand,
                 point_value, tags, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            ITEM_FIELDS.join(", ")
        );

        let row = sqlx::query(&sql)
            .bind(owner_id)
            .bind(&item.title)
            .bind(&item.description)
            .bind(&item.category)
            .bind(&item.size)
            .bind(&item.condition)
            .bind(&item.brand)
            .bind(item.point_value)
            .bind(&item.tags)
            .bind(&item.images)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::not_found("user", owner_id)
                } else {
                    StoreError::Database(e)
                }
            })?;

        Ok(item_from_row(&row, "")?)
    }

    async fn get_item(&self, id: i64) -> Result<Option<ItemWithOwner>, StoreError> {
        let sql = format!("{} WHERE i.id = $1", item_select());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| item_with_owner_from_row(&r)).transpose()?)
    }

    async fn list_items(&self, filter: ItemFilter) -> Result<Vec<ItemWithOwner>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(item_select());
        qb.push(" WHERE TRUE");

        if let Some(status) = filter.status {
            qb.push(" AND i.status = ").push_bind(status.as_str());
        }
        if let Some(category) = filter.category {
            qb.push(" AND i.category = ").push_bind(category);
        }
        if let Some(owner_id) = filter.owner_id {
            qb.push(" AND i.user_id = ").push_bind(owner_id);
        }
        if let Some(search) = filter.search {
            let pattern = like_pattern(&search);
            qb.push(" AND (i.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR i.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR i.brand ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY i.created_at DESC, i.id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(item_with_owner_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn list_user_items(&self, owner_id: &str) -> Result<Vec<Item>, StoreError> {
        let sql = format!(
            "SELECT {} FROM items WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            ITEM_FIELDS.join(", ")
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(|r| item_from_row(r, ""))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
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
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT user_id, title, status FROM items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("item", id))?;

        let owner_id: String = row.try_get("user_id")?;
        let title: String = row.try_get("title")?;
        let previous: ItemStatus = parse_column(&row, "status")?;

        sqlx::query("UPDATE items SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;

        let bonus = self.rules.approval_bonus;
        if ItemStatus::earns_bonus(previous, status) && bonus > 0 {
            // the item row lock serialises this check against other approvals
            let already_paid: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM point_transactions \
                 WHERE related_item_id = $1 AND type = 'bonus')",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if !already_paid {
                apply_entry(&mut *tx, &approval_bonus(&owner_id, id, &title, bonus)).await?;
                tracing::info!(
                    item_id = id,
                    owner_id = %owner_id,
                    amount = bonus,
                    "approval bonus paid"
                );
            }
        }

        tx.commit().await?;

        self.get_item(id)
            .await?
            .ok_or_else(|| StoreError::not_found("item", id))
    }

    async fn create_swap(&self, requester_id: &str, swap: NewSwap) -> Result<Swap, StoreError> {
        let requester_points: i32 = sqlx::query_scalar("SELECT points FROM users WHERE id = $1")
            .bind(requester_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("user", requester_id))?;

        let sql = format!(
            "SELECT {} FROM items i WHERE i.id = $1",
            select_list(ITEM_FIELDS, "i", "")
        );
        let item_row = sqlx::query(&sql)
            .bind(swap.item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("item", swap.item_id))?;
        let item = item_from_row(&item_row, "")?;

        check_swap_request(&item, requester_id, requester_points, &swap)?;

        let sql = format!(
            r#"
            INSERT INTO swaps (requester_id, owner_id, item_id, swap_type, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SWAP_FIELDS.join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(requester_id)
            .bind(&item.user_id)
            .bind(item.id)
            .bind(swap.swap_type.as_str())
            .bind(&swap.message)
            .fetch_one(&self.pool)
            .await?;

        Ok(swap_from_row(&row, "")?)
    }

    async fn get_swap(&self, id: i64) -> Result<Option<SwapWithDetails>, StoreError> {
        let sql = format!("{} WHERE s.id = $1", swap_select());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| swap_details_from_row(&r)).transpose()?)
    }

    async fn list_swaps(&self, filter: SwapFilter) -> Result<Vec<SwapWithDetails>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(swap_select());
        qb.push(" WHERE TRUE");

        if let Some(requester_id) = filter.requester_id {
            qb.push(" AND s.requester_id = ").push_bind(requester_id);
        }
        if let Some(owner_id) = filter.owner_id {
            qb.push(" AND s.owner_id = ").push_bind(owner_id);
        }
        if let Some(participant) = filter.participant_id {
            qb.push(" AND (s.requester_id = ")
                .push_bind(participant.clone())
                .push(" OR s.owner_id = ")
                .push_bind(participant)
                .push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND s.status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY s.created_at DESC, s.id DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let swaps = rows
            .iter()
            .map(swap_details_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(swaps)
    }

    async fn update_swap_status(
        &self,
        id: i64,
        status: SwapStatus,
    ) -> Result<SwapWithDetails, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT requester_id, owner_id, item_id, swap_type, status FROM swaps \
             WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("swap", id))?;

        let requester_id: String = row.try_get("requester_id")?;
        let owner_id: String = row.try_get("owner_id")?;
        let item_id: i64 = row.try_get("item_id")?;
        let swap_type: SwapType = parse_column(&row, "swap_type")?;
        let current: SwapStatus = parse_column(&row, "status")?;

        let next = current.transition_to(status)?;

        if next == SwapStatus::Completed {
            let item = sqlx::query(
                "SELECT title, point_value, status, is_available FROM items \
                 WHERE id = $1 FOR UPDATE",
            )
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::not_found("item", item_id))?;

            let title: String = item.try_get("title")?;
            let point_value: i32 = item.try_get("point_value")?;
            let item_status: ItemStatus = parse_column(&item, "status")?;
            let is_available: bool = item.try_get("is_available")?;
            if !is_available || item_status != ItemStatus::Approved {
                return Err(StoreError::ItemUnavailable { item_id });
            }

            let plan = SettlementPlan::for_completion(&SwapTerms {
                swap_type,
                requester_id: &requester_id,
                owner_id: &owner_id,
                item_id,
                item_title: &title,
                point_value,
            });

            if plan.moves_points() {
                // Lock both balances in a stable order
                let balances: Vec<(String, i32)> = sqlx::query_as(
                    "SELECT id, points FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE",
                )
                .bind(vec![requester_id.clone(), owner_id.clone()])
                .fetch_all(&mut *tx)
                .await?;

                let balance = balances
                    .iter()
                    .find(|(uid, _)| uid == &requester_id)
                    .map(|(_, points)| *points)
                    .ok_or_else(|| StoreError::not_found("user", &requester_id))?;
                plan.check_funds(&requester_id, balance)?;

                for entry in &plan.entries {
                    apply_entry(&mut *tx, entry).await?;
                }
            }

            sqlx::query("UPDATE items SET is_available = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(item_id)
                .execute(&mut *tx)
                .await?;

            tracing::info!(
                swap_id = id,
                item_id,
                amount = plan.required_from(&requester_id),
                "swap settled"
            );
        }

        sqlx::query("UPDATE swaps SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_swap(id)
            .await?
            .ok_or_else(|| StoreError::not_found("swap", id))
    }

    async fn list_user_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PointTransaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, type, description, related_item_id, created_at
            FROM point_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ledger = rows
            .iter()
            .map(transaction_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ledger)
    }

    async fn stats(&self) -> Result<MarketplaceStats, StoreError> {
        let (total_users, total_items, total_swaps, pending_items): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM items),
                    (SELECT COUNT(*) FROM swaps),
                    (SELECT COUNT(*) FROM items WHERE status = 'pending')
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(MarketplaceStats {
            total_users,
            total_items,
            total_swaps,
            pending_items,
        })
    }
}
