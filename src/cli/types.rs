//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::embed::EmbedArgs;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(name = "vectorgate")]
#[command(about = "vectorgate - tenant-aware embedding batching and caching", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./vectorgate.yaml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed one or more texts
    Embed(EmbedArgs),

    /// List registered embedding providers
    Providers,

    /// Show the effective embedding configuration
    Config,
}
