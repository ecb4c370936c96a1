use sea_orm::SqlxPostgresConnector;

use crate::db::{DbPool, OrmConn, raw_pool};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub page_size: i64,
}

impl AppState {
    pub fn new(orm: OrmConn, page_size: i64) -> Self {
        Self {
            pool: raw_pool(&orm),
            orm,
            page_size,
        }
    }

    /// Build state on top of an existing sqlx pool; SeaORM shares it.
    pub fn from_pool(pool: DbPool, page_size: i64) -> Self {
        Self {
            orm: SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone()),
            pool,
            page_size,
        }
    }
}
