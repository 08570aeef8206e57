mod commands;
mod context;
mod display;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retro", version, about = "Catalog your books, vinyls and films")]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = commands::run(cli.command).await {
        tracing::debug!(error = ?err, "command failed");
        eprintln!("{} {}", style("Erreur:").red().bold(), display::error_report(&err));
        std::process::exit(1);
    }
}
