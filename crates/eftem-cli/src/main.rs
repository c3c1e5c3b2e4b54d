mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eftem", about = "Elemental maps from energy-filtered TEM image stacks")]
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
    /// Fit the pre-edge background and compute the elemental map
    Map(commands::map::MapArgs),
    /// List ionisation edges
    Edges(commands::edges::EdgesArgs),
    /// Print or save an example map config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("warn,eftem_core=debug,eftem=debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .init();

    match &cli.command {
        Commands::Map(args) => commands::map::run(args),
        Commands::Edges(args) => commands::edges::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
