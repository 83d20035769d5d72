//! bridgectl - CLI client for the bridged migration daemon.

mod client;
mod render;

use clap::{Parser, Subcommand};
use client::{Client, CreateMigrationRequest};
use serde_json::Value;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DEFAULT_ADDR: &str = "http://127.0.0.1:9130";

#[derive(Debug, Parser)]
#[command(name = "bridgectl", about = "Control the test asset migration daemon")]
struct Cli {
    /// Daemon address.
    #[arg(long, env = "BRIDGED_ADDR", default_value = DEFAULT_ADDR)]
    addr: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a migration workflow.
    Submit {
        /// Source system (e.g. zephyr).
        #[arg(long)]
        source: String,
        /// Target system (e.g. qtest).
        #[arg(long)]
        target: String,
        /// Project key in the source system.
        #[arg(long)]
        project: String,
        /// Extra options as a JSON object (fieldMappings, valueMappings,
        /// filters, adapter configs).
        #[arg(long)]
        options: Option<String>,
    },
    /// List workflows.
    List,
    /// Show one workflow with its steps.
    Get { id: String },
    /// Start or resume a workflow.
    Start { id: String },
    /// Request cancellation at the next step boundary.
    Cancel { id: String },
    /// Reset a step to PENDING so the next start reruns it.
    RetryStep { id: String, order: u32 },
    /// Check daemon health.
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = Client::new(cli.addr.clone());

    let result = run(&client, cli.command).await;
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(client: &Client, command: Command) -> client::Result<()> {
    match command {
        Command::Submit {
            source,
            target,
            project,
            options,
        } => {
            let options = match options {
                Some(raw) => Some(parse_options(&raw)?),
                None => None,
            };
            let workflow = client
                .submit_migration(&CreateMigrationRequest {
                    source_system: source,
                    target_system: target,
                    project_key: project,
                    options,
                })
                .await?;
            render::print_workflow_created(&workflow);
        }
        Command::List => {
            let workflows = client.list_workflows().await?;
            render::print_workflow_list(&workflows);
        }
        Command::Get { id } => {
            let workflow = client.get_workflow(&id).await?;
            render::print_workflow_details(&workflow);
        }
        Command::Start { id } => {
            let workflow = client.start_workflow(&id).await?;
            println!("Started workflow: {} ({})", workflow.id, workflow.state.as_str());
        }
        Command::Cancel { id } => {
            client.cancel_workflow(&id).await?;
            println!("Cancellation requested: {id}");
        }
        Command::RetryStep { id, order } => {
            client.retry_step(&id, order).await?;
            println!("Step {order} reset on workflow {id}");
        }
        Command::Health => {
            let health = client.health().await?;
            println!("Daemon: {} at {}", health.status, health.timestamp);
        }
    }
    Ok(())
}

fn parse_options(raw: &str) -> client::Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| client::ClientError::InvalidResponse(format!("invalid --options JSON: {e}")))
}
