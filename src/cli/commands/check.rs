//! Implementation of the `bothost check` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, yes_no, CommandOutput};
use crate::domain::models::BotConfig;
use crate::infrastructure::config::{ConfigLoader, LoadOptions};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Configuration file to check
    pub config: PathBuf,

    /// Reject unknown top-level keys
    #[arg(long)]
    pub strict: bool,

    /// Apply environment overrides with this prefix (e.g. BOTHOST_)
    #[arg(long)]
    pub env_prefix: Option<String>,
}

impl CheckArgs {
    pub fn load_options(&self) -> LoadOptions {
        let options = LoadOptions::default().strict(self.strict);
        match &self.env_prefix {
            Some(prefix) => options.with_env_prefix(prefix.clone()),
            None => options,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub valid: bool,
    pub path: PathBuf,
    pub user_id: String,
    pub homeserver: String,
    pub appservice: bool,
    pub sync: bool,
    pub encryption: bool,
    pub database_backend: &'static str,
    pub pool_size: (u32, u32),
    pub server_url: Option<String>,
    pub log_stream: bool,
    pub plugin_config_keys: usize,
}

impl CheckOutput {
    pub fn from_config(path: PathBuf, config: &BotConfig) -> Self {
        let backend = config.database.backend();
        Self {
            valid: true,
            path,
            user_id: config.user.credentials.id.to_string(),
            homeserver: config.user.credentials.homeserver.to_string(),
            appservice: config.user.appservice,
            sync: config.user.sync,
            encryption: config.encryption_enabled(),
            database_backend: backend.name(),
            pool_size: config.database_opts.pool_bounds(backend),
            server_url: config.server.as_ref().map(|server| server.public_base_url()),
            log_stream: config
                .server
                .as_ref()
                .is_some_and(|server| server.log_token.is_some()),
            plugin_config_keys: config.plugin_config.len(),
        }
    }
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Configuration {} is valid", self.path.display()),
            format!("  User:        {}", self.user_id),
            format!("  Homeserver:  {}", self.homeserver),
            format!("  Sync:        {}", yes_no(self.sync)),
            format!("  Appservice:  {}", yes_no(self.appservice)),
            format!("  Encryption:  {}", yes_no(self.encryption)),
            format!(
                "  Database:    {} (pool {}..={})",
                self.database_backend, self.pool_size.0, self.pool_size.1
            ),
        ];
        match &self.server_url {
            Some(url) => lines.push(format!("  Web server:  {url}")),
            None => lines.push("  Web server:  disabled".to_string()),
        }
        lines.push(format!("  Log stream:  {}", yes_no(self.log_stream)));
        lines.push(format!("  Plugin keys: {}", self.plugin_config_keys));
        lines.join("\n")
    }
}

pub async fn execute(args: CheckArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load_from_file(&args.config, &args.load_options())
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;

    output(&CheckOutput::from_config(args.config, &config), json_mode);
    Ok(())
}
