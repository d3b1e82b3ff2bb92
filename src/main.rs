//! vectorgate CLI entry point.

use clap::Parser;

use vectorgate::cli::{Cli, Commands};
use vectorgate::infrastructure::logging::LoggerImpl;
use vectorgate::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => vectorgate::cli::handle_error(err, cli.json),
    };

    // Held for the life of the process so buffered file logs are flushed.
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => vectorgate::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Embed(args) => {
            vectorgate::cli::commands::embed::execute(args, &config, cli.json).await
        }
        Commands::Providers => vectorgate::cli::commands::providers::execute(&config, cli.json).await,
        Commands::Config => vectorgate::cli::commands::config::execute(&config, cli.json).await,
    };

    if let Err(err) = result {
        vectorgate::cli::handle_error(err, cli.json);
    }
}
