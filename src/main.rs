//! bothost CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bothost::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `run` installs its own subscriber from the config's logging section
    if !matches!(cli.command, Commands::Run(_)) {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let result = match cli.command {
        Commands::Check(args) => bothost::cli::commands::check::execute(args, cli.json).await,
        Commands::Show(args) => bothost::cli::commands::show::execute(args, cli.json).await,
        Commands::Init(args) => bothost::cli::commands::init::execute(args, cli.json).await,
        Commands::Run(args) => bothost::cli::commands::run::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        bothost::cli::handle_error(err, cli.json);
    }
}
