//! Persistence adapters (sqlx pools for SQLite and Postgres).

pub mod connection;

pub use connection::{create_pool, verify_connection, ConnectionError, DatabasePool};
