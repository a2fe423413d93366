//! Agora CLI - local package manager for AI-agent tooling

use clap::Parser;

use agora_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Handle Ctrl+C gracefully; partially-installed packages are cleaned
    // up with `agora uninstall`.
    tokio::select! {
        result = cli.run() => {
            if let Err(e) = result {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted");
            std::process::exit(1);
        }
    }
}
