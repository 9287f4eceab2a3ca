//! Implementation of the `bothost show` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::BotConfig;
use crate::infrastructure::config::{ConfigLoader, LoadOptions};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Configuration file to print
    pub config: PathBuf,

    /// Print tokens and database passwords instead of redacting them
    #[arg(long)]
    pub reveal_secrets: bool,
}

#[derive(Debug, Serialize)]
pub struct ShowOutput {
    pub config: BotConfig,
    #[serde(skip)]
    pub yaml: String,
}

impl CommandOutput for ShowOutput {
    fn to_human(&self) -> String {
        self.yaml.trim_end().to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

pub async fn execute(args: ShowArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load_from_file(&args.config, &LoadOptions::default())
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;
    let config = if args.reveal_secrets {
        config
    } else {
        config.redacted()
    };

    let yaml = config.to_yaml().context("Failed to serialize configuration")?;
    output(&ShowOutput { config, yaml }, json_mode);
    Ok(())
}
