//! Idempotent schema bootstrap
//!
//! Runs at server start and from `rewear migrate`. Every statement is
//! `IF NOT EXISTS`, so running it twice is harmless.

use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT UNIQUE,
        first_name TEXT,
        last_name TEXT,
        profile_image_url TEXT,
        points INTEGER NOT NULL DEFAULT 100 CHECK (points >= 0),
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        title TEXT NOT NULL,
        description TEXT,
        category TEXT NOT NULL,
        size TEXT NOT NULL,
        condition TEXT NOT NULL,
        brand TEXT,
        point_value INTEGER NOT NULL CHECK (point_value > 0),
        tags TEXT[] NOT NULL DEFAULT '{}',
        images TEXT[] NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'approved', 'rejected')),
        is_available BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS swaps (
        id BIGSERIAL PRIMARY KEY,
        requester_id TEXT NOT NULL REFERENCES users(id),
        owner_id TEXT NOT NULL REFERENCES users(id),
        item_id BIGINT NOT NULL REFERENCES items(id),
        swap_type TEXT NOT NULL CHECK (swap_type IN ('direct', 'points')),
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'accepted', 'rejected', 'completed')),
        message TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS point_transactions (
        id BIGSERIAL PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        amount INTEGER NOT NULL,
        type TEXT NOT NULL CHECK (type IN ('earned', 'spent', 'bonus')),
        description TEXT,
        related_item_id BIGINT REFERENCES items(id),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_items_status_created ON items (status, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_items_user ON items (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_swaps_requester ON swaps (requester_id)",
    "CREATE INDEX IF NOT EXISTS idx_swaps_owner ON swaps (owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_point_transactions_user \
     ON point_transactions (user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_point_transactions_item \
     ON point_transactions (related_item_id, type)",
];

/// Create all tables and indexes
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running schema bootstrap...");

    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(statements = STATEMENTS.len(), "Schema ready");
    Ok(())
}
