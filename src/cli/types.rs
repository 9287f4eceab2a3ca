//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};

use super::commands::check::CheckArgs;
use super::commands::init::InitArgs;
use super::commands::run::RunArgs;
use super::commands::show::ShowArgs;

#[derive(Parser, Debug)]
#[command(name = "bothost")]
#[command(about = "Standalone host for a single Matrix bot", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate a configuration file
    Check(CheckArgs),

    /// Print the normalized configuration
    Show(ShowArgs),

    /// Write an annotated example configuration
    Init(InitArgs),

    /// Start the bot host
    Run(RunArgs),
}
