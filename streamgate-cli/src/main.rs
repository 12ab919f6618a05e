//! Streamgate CLI - Command-line interface
//!
//! Provides command-line access to the streaming server.

mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "streamgate")]
#[command(about = "Range-aware HTTP streaming proxy for media backends")]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::handle_command(cli.command).await
}
