//! Adapters for external systems: the database and the embedded web server.

pub mod database;
pub mod http;
