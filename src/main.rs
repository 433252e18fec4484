use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use stress_test::{stress_test_edits, StressConfig};
use textsync_server::config::{
    DEFAULT_BIND_ADDR, DEFAULT_COORDINATION_ADDR, DEFAULT_INDEX_PATH,
    DEFAULT_OBSERVER_QUEUE_CAPACITY,
};
use textsync_server::{ServerConfigBuilder, SyncEngine};
use tracing_subscriber::EnvFilter;


#[derive(Parser)]
#[command(name = "textsync")]
#[command(about = "Shared text document server with real-time edit fan-out")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WebSocket server
    Serve(ServeArgs),
    /// Hammer an in-process engine with concurrent editors and check the result
    Stress(StressArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "TEXTSYNC_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind: SocketAddr,

    /// Coordination store address (recognized, currently unused)
    #[arg(long, env = "REDIS_ADDR", default_value = DEFAULT_COORDINATION_ADDR)]
    coordination_addr: String,

    /// File served at `/`
    #[arg(long, env = "TEXTSYNC_INDEX", default_value = DEFAULT_INDEX_PATH)]
    index: PathBuf,

    /// Undelivered broadcasts an observer may queue before it is dropped
    #[arg(long, env = "TEXTSYNC_QUEUE_CAPACITY", default_value_t = DEFAULT_OBSERVER_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

#[derive(Args)]
struct StressArgs {
    /// Concurrent editors
    #[arg(long, default_value_t = 8)]
    editors: usize,

    /// Edits submitted by each editor
    #[arg(long, default_value_t = 500)]
    edits: usize,

    /// Observers receiving broadcasts
    #[arg(long, default_value_t = 4)]
    observers: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("textsync=info,textsync_server=info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => {
            let config = ServerConfigBuilder::new()
                .bind_addr(args.bind)
                .coordination_addr(args.coordination_addr)
                .index_path(args.index)
                .observer_queue_capacity(args.queue_capacity)
                .build();
            let engine = Arc::new(SyncEngine::new());
            textsync_server::serve(engine, config).await?;
        }
        Commands::Stress(args) => {
            let stats = stress_test_edits(StressConfig {
                editors: args.editors,
                edits_per_editor: args.edits,
                observers: args.observers,
            })
            .await?;
            stats.print();
        }
    }

    Ok(())
}
