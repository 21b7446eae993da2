mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asdomain")]
#[command(
    about = "Converge GlassFish and Payara domains to their declared state",
    long_about = None
)]
struct Cli {
    /// Configuration file (discovered when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Print the run result as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or repair domains until they match the configuration
    Converge {
        /// Domain name (all declared domains when omitted)
        domain: Option<String>,
    },
    /// Show the actions a converge run would take, without applying them
    Plan {
        /// Domain name (all declared domains when omitted)
        domain: Option<String>,
    },
    /// Stop the service and remove the domain and its unit files
    Destroy {
        /// Domain name
        domain: String,
        /// Run without confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays usable for --json
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("asdomain {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (config_path, manifest) = utils::load_manifest(cli.config.as_deref())?;
    if !cli.json {
        utils::print_loaded_config_file(&config_path);
    }

    match cli.command {
        Commands::Converge { domain } => {
            commands::converge::handle(&manifest, domain.as_deref(), cli.json).await?;
        }
        Commands::Plan { domain } => {
            commands::plan::handle(&manifest, domain.as_deref()).await?;
        }
        Commands::Destroy { domain, yes } => {
            commands::destroy::handle(&manifest, &domain, yes, cli.json).await?;
        }
        Commands::Version => {}
    }

    Ok(())
}
