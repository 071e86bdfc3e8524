//! Native-messaging host.
//!
//! Firefox launches this binary and owns its stdin/stdout as the framed
//! native-messaging channel. The host binds the command socket, relays every
//! socket request to the extension through the multiplexer, and exits when
//! the browser side goes away. Stdout belongs to the wire, so all logging
//! goes to a file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use foxbridge::{ipc, CommandServer, FramedChannel, RequestMultiplexer};
use tracing::info;

#[derive(Parser)]
#[command(name = "foxbridge-host")]
#[command(about = "Native-messaging host relaying commands into Firefox")]
struct Args {
    /// Command socket path (defaults to the per-user runtime directory)
    #[clap(long)]
    socket: Option<PathBuf>,

    /// Positional arguments Firefox passes to native-messaging hosts
    /// (manifest path and extension id); accepted and ignored.
    #[clap(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    #[allow(dead_code)]
    browser_args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging();

    let socket_path = args.socket.unwrap_or_else(ipc::socket_path);

    let mux = Arc::new(RequestMultiplexer::new());
    mux.attach(FramedChannel::boxed(tokio::io::stdin(), tokio::io::stdout()))
        .await;

    let server = CommandServer::bind(&socket_path)
        .with_context(|| format!("binding command socket at {}", socket_path.display()))?;
    info!(
        socket = %socket_path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "host started"
    );

    tokio::select! {
        result = server.run(mux.clone()) => {
            result.context("command socket server failed")?;
        }
        _ = mux.disconnected() => {
            info!("browser channel closed, shutting down");
        }
    }

    ipc::cleanup_socket(&socket_path);
    Ok(())
}

/// File logging in the runtime directory. The returned guard must stay
/// alive for the duration of the process or buffered lines are lost.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let appender = tracing_appender::rolling::never(ipc::log_dir(), ipc::LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init();
    guard
}
