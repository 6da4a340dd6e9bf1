#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use maplefile::documents::BinaryStoreHandle;
use maplefile::migrate;
use maplefile::state::AppState;

pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await?;
    migrate::apply_migrations(&pool).await?;
    Ok(pool)
}

pub async fn memory_state() -> Result<AppState> {
    Ok(AppState::new(
        memory_pool().await?,
        BinaryStoreHandle::in_memory(),
    ))
}
