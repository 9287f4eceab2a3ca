//! bothost - standalone host for a single Matrix bot
//!
//! Loads and validates the host's YAML configuration, then wires the
//! validated [`BotConfig`] into the components that need it: logging, the
//! database pool and the embedded web server.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): configuration model and validated values
//! - **Infrastructure Layer** (`infrastructure`): config loading and logging
//! - **Adapters** (`adapters`): database pools and the HTTP server
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use bothost::{ConfigLoader, LoadOptions};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load_from_file("config.yaml", &LoadOptions::default())?;
//!     println!("running as {}", config.user.credentials.id);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::models::{
    BotConfig, Credentials, DatabaseOpts, LoggingSection, ProfileField, ServerConfig, UserConfig,
};
pub use infrastructure::config::{ConfigError, ConfigLoader, LoadOptions};
pub use infrastructure::logging;
