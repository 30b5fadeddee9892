use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "logsift")]
#[command(about = "Access-log cleaning, geolocation enrichment, and aggregation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one batch over the configured input
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Path to the TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the input prefix
    #[arg(long)]
    pub input: Option<String>,

    /// Override the output prefix
    #[arg(long)]
    pub output: Option<String>,
}
