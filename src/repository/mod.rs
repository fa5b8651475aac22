//! Repository layer for database operations.
//!
//! Methods are grouped per table family and prefixed by domain
//! (`equipment_*`, `loans_*`, ...). Those taking a `&mut PgConnection`
//! run inside a caller-owned transaction.

pub mod audit;
pub mod categories;
pub mod content;
pub mod equipment;
pub mod labs;
pub mod loans;
pub mod maintenance;
pub mod notifications;
pub mod stats;
pub mod users;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppResult;

/// Transaction handle passed between repository calls
pub type Tx = Transaction<'static, Postgres>;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Start a transaction; dropped without commit it rolls back
    pub async fn begin(&self) -> AppResult<Tx> {
        Ok(self.pool.begin().await?)
    }
}
