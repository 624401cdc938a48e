//! ks - knowledge source health probe
//!
//! Checks that the code-graph service and the repository checkout used by
//! brdgen are reachable before a generation run.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use knowledgestore::{GraphClient, LocalContentSource};

#[derive(Parser)]
#[command(name = "ks", about = "Knowledge source utilities for brdgen")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that both knowledge sources are reachable
    Health {
        /// Code-graph service URL
        #[arg(long, default_value = "http://localhost:3006")]
        graph_url: String,

        /// Repository checkout root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Per-call timeout in milliseconds
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Health {
            graph_url,
            root,
            timeout_ms,
        } => {
            let mut healthy = true;

            match GraphClient::new(&graph_url, Duration::from_millis(timeout_ms)) {
                Ok(client) => {
                    if client.health_check().await {
                        println!("graph      ok    {}", graph_url);
                    } else {
                        println!("graph      FAIL  {}", graph_url);
                        healthy = false;
                    }
                }
                Err(e) => {
                    println!("graph      FAIL  {} ({})", graph_url, e);
                    healthy = false;
                }
            }

            let content = LocalContentSource::new(&root);
            if content.health_check() {
                println!("content    ok    {}", root.display());
            } else {
                println!("content    FAIL  {}", root.display());
                healthy = false;
            }

            if !healthy {
                std::process::exit(1);
            }
        }
    }
}
