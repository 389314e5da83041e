mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ganglion::compression::CompressionStrategy;
use ganglion::config::GanglionConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ganglion", version, about = "Vector store and memory compression MCP server")]
struct Cli {
    /// Config file (defaults to ~/.ganglion/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (transport from config: stdio or http)
    Serve,
    /// Show vector index statistics
    Stats,
    /// Nearest-neighbor search with a JSON array query (file path, or - for stdin)
    Search {
        query: PathBuf,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Compress a memory JSON document (file path, or - for stdin) to a byte budget
    Compress {
        input: PathBuf,
        #[arg(short, long)]
        strategy: Option<CompressionStrategy>,
        #[arg(long)]
        max_size: Option<usize>,
        #[arg(long)]
        retention_threshold: Option<f64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GanglionConfig::load_from(path)?,
        None => GanglionConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => match config.server.transport.as_str() {
            "http" | "sse" => server::serve_http(config).await?,
            _ => server::serve_stdio(config).await?,
        },
        Command::Stats => cli::stats::stats(&config)?,
        Command::Search { query, k } => cli::search::search(&config, &query, k)?,
        Command::Compress {
            input,
            strategy,
            max_size,
            retention_threshold,
            output,
        } => cli::compress::compress(
            &config,
            &input,
            strategy,
            max_size,
            retention_threshold,
            output.as_deref(),
        )?,
    }

    Ok(())
}
