//! Database connection pool management.
//!
//! The backend is chosen by the `database` URI scheme; pool bounds come from
//! `database_opts` (see [`DatabaseOpts::pool_bounds`]).

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::config::DatabaseOpts;
use crate::domain::models::database::{DatabaseBackend, DatabaseUrl};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to create pool: {0}")]
    PoolCreationFailed(#[source] sqlx::Error),
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
    #[error("Failed to create directory: {0}")]
    DirectoryCreationFailed(#[source] std::io::Error),
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),
}

/// An open pool for whichever backend the configuration selected
#[derive(Debug, Clone)]
pub enum DatabasePool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl DatabasePool {
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Number of open connections
    pub fn size(&self) -> u32 {
        match self {
            Self::Sqlite(pool) => pool.size(),
            Self::Postgres(pool) => pool.size(),
        }
    }

    pub async fn close(&self) {
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
        }
    }
}

/// Open a pool for the configured backend
pub async fn create_pool(
    url: &DatabaseUrl,
    opts: &DatabaseOpts,
) -> Result<DatabasePool, ConnectionError> {
    let (min_connections, max_connections) = opts.pool_bounds(url.backend());
    tracing::debug!(
        database = %url.redacted(),
        backend = url.backend().name(),
        min_connections,
        max_connections,
        "opening database pool"
    );

    match url.backend() {
        DatabaseBackend::Sqlite { path } => {
            ensure_database_directory(path)?;
            let connect_options = SqliteConnectOptions::from_str(url.as_str())
                .map_err(|_| ConnectionError::InvalidDatabaseUrl(url.redacted()))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true)
                .busy_timeout(Duration::from_secs(30));

            // min_size doubles as the worker pool size; max_size is ignored
            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                .min_connections(min_connections)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect_with(connect_options)
                .await
                .map_err(ConnectionError::PoolCreationFailed)?;
            Ok(DatabasePool::Sqlite(pool))
        }
        DatabaseBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(max_connections)
                .min_connections(min_connections)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect(url.as_str())
                .await
                .map_err(ConnectionError::PoolCreationFailed)?;
            Ok(DatabasePool::Postgres(pool))
        }
    }
}

fn ensure_database_directory(path: &str) -> Result<(), ConnectionError> {
    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(ConnectionError::DirectoryCreationFailed)?;
        }
    }
    Ok(())
}

pub async fn verify_connection(pool: &DatabasePool) -> Result<(), ConnectionError> {
    match pool {
        DatabasePool::Sqlite(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.map(|_| ()),
        DatabasePool::Postgres(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.map(|_| ()),
    }
    .map_err(ConnectionError::ConnectionFailed)
}
