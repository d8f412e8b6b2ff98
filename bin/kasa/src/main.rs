mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kasa")]
#[command(about = "An intent-routed greeting and weather search agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Send one message and stream the task events to stdout
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,

        /// Conversation context id (stable across related requests)
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(force)?;
        }
        Commands::Chat { message, context } => {
            commands::chat::run(&message, context.as_deref()).await?;
        }
        Commands::Serve { host, port } => {
            commands::serve::run(host, port).await?;
        }
    }

    Ok(())
}
