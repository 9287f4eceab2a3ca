//! Implementation of the `bothost run` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::adapters::database::{create_pool, verify_connection};
use crate::adapters::http::HttpServer;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::BotConfig;
use crate::infrastructure::config::{ConfigLoader, LoadOptions};
use crate::infrastructure::logging::{info, warn, LogCollector, LogConfig, LogFormat, LoggerImpl};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file to run with
    pub config: PathBuf,

    /// Reject unknown top-level keys
    #[arg(long)]
    pub strict: bool,

    /// Apply environment overrides with this prefix (e.g. BOTHOST_)
    #[arg(long)]
    pub env_prefix: Option<String>,

    /// Override the level from the logging section
    #[arg(long)]
    pub log_level: Option<String>,

    /// Stdout log format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl RunArgs {
    fn load_options(&self) -> LoadOptions {
        let options = LoadOptions::default().strict(self.strict);
        match &self.env_prefix {
            Some(prefix) => options.with_env_prefix(prefix.clone()),
            None => options,
        }
    }

    /// Logging settings from the config's logging section plus CLI overrides
    pub fn log_config(&self, config: &BotConfig) -> LogConfig {
        let mut log_config = LogConfig::from_section(&config.logging);
        if let Some(level) = &self.log_level {
            log_config.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            log_config.format = format;
        }
        log_config
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub user_id: String,
    pub stopped: bool,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        format!("Bot host for {} stopped", self.user_id)
    }
}

type ServerTask = JoinHandle<std::io::Result<()>>;

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load_from_file(&args.config, &args.load_options())
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;

    let collector = LogCollector::new();
    let _logger = LoggerImpl::init(&args.log_config(&config), collector.clone())
        .context("Failed to initialize logging")?;

    let user_id = config.user.credentials.id.clone();
    info!(
        user = %user_id,
        homeserver = %config.user.credentials.homeserver,
        sync = config.user.sync,
        appservice = config.user.appservice,
        encryption = config.encryption_enabled(),
        "starting bot host"
    );
    for (field, value) in config.user.profile_updates() {
        info!(field, value, "profile field will be updated");
    }

    let pool = create_pool(&config.database, &config.database_opts)
        .await
        .context("Failed to open database")?;
    verify_connection(&pool)
        .await
        .context("Database connection check failed")?;
    info!(backend = pool.backend_name(), connections = pool.size(), "database ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_task = config.server.clone().map(|server| {
        let http = HttpServer::new(server, user_id.clone(), collector.clone(), shutdown_rx.clone());
        let mut signal = shutdown_rx.clone();
        tokio::spawn(http.serve_with_shutdown(async move {
            let _ = signal.changed().await;
        }))
    });

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => signal.context("Failed to listen for shutdown signal"),
        result = server_exit(&mut server_task) => result,
    };

    info!("shutting down");
    let _ = shutdown_tx.send(true);
    if let Some(task) = server_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "web server stopped with an error"),
            Err(err) => warn!(error = %err, "web server task failed"),
        }
    }
    pool.close().await;
    outcome?;

    output(
        &RunOutput {
            user_id: user_id.to_string(),
            stopped: true,
        },
        json_mode,
    );
    Ok(())
}

/// Resolves only if the web server stops on its own
async fn server_exit(task: &mut Option<ServerTask>) -> Result<()> {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };
    let result = handle.await;
    *task = None;
    match result {
        Ok(Ok(())) => anyhow::bail!("Web server stopped unexpectedly"),
        Ok(Err(err)) => Err(err).context("Web server failed"),
        Err(err) => Err(err).context("Web server task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::infrastructure::config::EXAMPLE_CONFIG;
    use clap::Parser;

    #[test]
    fn test_log_overrides_apply_on_top_of_section() {
        let cli = Cli::try_parse_from([
            "bothost",
            "run",
            "config.yaml",
            "--log-level",
            "warn",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        let crate::cli::Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let config = ConfigLoader::load_from_str(EXAMPLE_CONFIG, &LoadOptions::default()).unwrap();

        let log_config = args.log_config(&config);
        assert_eq!(log_config.level, "warn");
        assert_eq!(log_config.format, LogFormat::Pretty);
        assert!(log_config.enable_stdout);
    }

    #[test]
    fn test_log_config_defaults_to_section() {
        let cli = Cli::try_parse_from(["bothost", "run", "config.yaml"]).unwrap();
        let crate::cli::Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let config = ConfigLoader::load_from_str(EXAMPLE_CONFIG, &LoadOptions::default()).unwrap();

        assert_eq!(args.log_config(&config).level, "debug");
    }
}
