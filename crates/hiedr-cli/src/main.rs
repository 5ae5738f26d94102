mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "hiedr2mosaic",
    about = "Turn HiRISE RED channel EDRs into a normalized CCD mosaic"
)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the EDR-to-mosaic pipeline
    Run(commands::run::RunArgs),
    /// Print or save a default pipeline config
    Config(commands::config::ConfigArgs),
    /// Show the offsets recorded in a registration report
    Offsets(commands::offsets::OffsetsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Offsets(args) => commands::offsets::run(args),
    }
}
