//! Implementation of the `bothost init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::EXAMPLE_CONFIG;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite the file if it already exists
    #[arg(long, short)]
    pub force: bool,

    /// Where to write the example configuration
    #[arg(default_value = "config.yaml")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub path: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        if self.success {
            format!(
                "{}\n\nEdit the credentials in {} and run `bothost check {}`",
                self.message,
                self.path.display(),
                self.path.display()
            )
        } else {
            self.message.clone()
        }
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target = args.path;

    if target.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: format!(
                "{} already exists. Use --force to overwrite it.",
                target.display()
            ),
            path: target,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&target, EXAMPLE_CONFIG)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    let output_data = InitOutput {
        success: true,
        message: format!("Wrote example configuration to {}", target.display()),
        path: target,
    };
    output(&output_data, json_mode);
    Ok(())
}
