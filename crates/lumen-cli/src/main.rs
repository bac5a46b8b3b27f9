//! Lumen CLI - real-time LED-lighting video server.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lumen")]
#[command(author, version, about = "Lumen LED video server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server: play sessions and transmit Art-Net
    Serve(commands::serve::ServeArgs),

    /// List available effect, generator, and transition plugins
    Effects(commands::effects::EffectsArgs),

    /// Inspect a point-set file
    Points(commands::points::PointsArgs),

    /// Validate a session file
    Session(commands::session::SessionArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args),
        Commands::Effects(args) => commands::effects::run(args),
        Commands::Points(args) => commands::points::run(args),
        Commands::Session(args) => commands::session::run(args),
    }
}
