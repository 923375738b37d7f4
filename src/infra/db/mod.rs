//! SQLite-backed repository implementations.

mod comments;
mod follows;
mod groups;
mod posts;
mod sessions;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::{str::FromStr, sync::Arc};

use sqlx::{
    query,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};

#[derive(Clone)]
pub struct SqliteRepositories {
    pool: Arc<SqlitePool>,
}

impl SqliteRepositories {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a pool, creating the database file when it does not exist yet.
    pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
    }

    pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}
