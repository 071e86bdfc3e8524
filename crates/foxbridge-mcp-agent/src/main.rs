//! MCP agent entrypoint: serves the tool surface over stdio.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use foxbridge::ipc;
use foxbridge_mcp_agent::FirefoxAgent;
use rmcp::{transport::stdio, ServiceExt};
use tracing::info;

#[derive(Parser)]
#[command(name = "foxbridge-mcp-agent")]
#[command(about = "MCP server exposing Firefox control tools")]
struct Args {
    /// Command socket path (defaults to the per-user runtime directory)
    #[clap(long)]
    socket: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout carries the MCP transport; logs go to stderr.
    init_logging();
    let args = Args::parse();
    let socket_path = args.socket.unwrap_or_else(ipc::socket_path);
    info!(socket = %socket_path.display(), "starting MCP agent");

    let service = FirefoxAgent::new(socket_path)
        .serve(stdio())
        .await
        .context("starting MCP server on stdio")?;
    service.waiting().await?;
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
