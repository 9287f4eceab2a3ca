//! Command-line interface for the bot host.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::infrastructure::config::ConfigError;

/// Print an error in the requested format and exit with a non-zero status
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let config_error = err.downcast_ref::<ConfigError>();
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
            "kind": config_error.map(ConfigError::kind),
            "path": config_error.and_then(ConfigError::field_path),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
