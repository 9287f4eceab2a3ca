//! Configuration management infrastructure
//!
//! Layered configuration using figment:
//! - YAML document parsing with syntax locations
//! - Optional environment variable overrides
//! - Required-field and cross-field validation
//! - Typed errors naming the offending field

pub mod error;
pub mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, LoadOptions, EXAMPLE_CONFIG};
