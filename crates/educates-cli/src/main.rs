//! Educates CLI.
//!
//! Deploys workshops to training portals on a Kubernetes cluster and opens
//! deployed portals in a browser.

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use educates_cli::commands::deploy::DeployCommand;
use educates_cli::commands::portal::PortalCommand;
use educates_cli::ui;

/// Educates - workshop training platform CLI.
#[derive(Parser)]
#[command(
    name = "educates",
    version,
    about = "Deploy workshops to Educates training portals",
    long_about = "Deploy workshops to Educates training portals.\n\n\
                  Each deploy publishes the workshop definition and adds or updates\n\
                  its entry in the training portal, creating the portal if needed.\n\
                  Re-running the same deploy leaves the portal unchanged."
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[allow(clippy::large_enum_variant)] // Deploy is the primary command, boxing adds indirection
enum Commands {
    /// Deploy workshop to Kubernetes.
    Deploy(DeployCommand),

    /// Manage training portals.
    Portal(PortalCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info,educates_cli=debug")
        } else {
            EnvFilter::new("warn,educates_cli=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Deploy(cmd) => cmd.run().await,
        Commands::Portal(cmd) => cmd.run().await,
    };

    if let Err(err) = result {
        ui::print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}
