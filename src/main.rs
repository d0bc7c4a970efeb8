use clap::Parser;
use dotenv::dotenv;
use pairpilot::cli::{Cli, Commands};
use pairpilot::commands::{run_signal, run_trade};
use pairpilot::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from the .env file
    dotenv().ok();

    let cli = Cli::parse();

    // Held until exit so the file writer flushes
    let _log_guard = init_tracing(&cli.verbose, &cli.log_dir)?;

    match cli.command {
        Commands::Trade(args) => run_trade(args).await?,
        Commands::Signal(args) => run_signal(args).await?,
    }

    Ok(())
}
