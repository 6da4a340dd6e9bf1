use sqlx::SqlitePool;

use crate::documents::BinaryStoreHandle;

/// Shared handles threaded through the command surface. Cloning is cheap;
/// the pool and binary store are reference-counted internally.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub documents: BinaryStoreHandle,
}

impl AppState {
    pub fn new(pool: SqlitePool, documents: BinaryStoreHandle) -> Self {
        Self { pool, documents }
    }
}
