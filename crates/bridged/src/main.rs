//! bridged - Test Asset Migration Daemon
//!
//! Main entry point for the daemon binary.

use std::sync::Arc;

use bridged::server::{start_server, AppState};
use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "bridged", about = "Test asset migration daemon")]
struct Args {
    /// Port for the local HTTP API.
    #[arg(long, env = "BRIDGED_PORT", default_value_t = 9130)]
    port: u16,

    /// Maximum concurrently executing workflows.
    #[arg(long, env = "BRIDGED_MAX_WORKFLOWS", default_value_t = 4)]
    max_workflows: usize,
}

fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let state = Arc::new(AppState::new(args.max_workflows));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    runtime.block_on(async {
        tokio::select! {
            result = start_server(state, args.port) => {
                if let Err(e) = result {
                    error!("server error: {}", e);
                    std::process::exit(1);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received SIGINT, shutting down");
            }
        }
    });
}
