//! Command-line client for the browser relay.
//!
//! Each invocation opens one connection to the host's command socket, sends
//! one command, prints the JSON result, and exits. Failures from anywhere
//! down the relay come back as one error line and a non-zero exit.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use foxbridge::{client, ipc};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "foxbridge")]
#[command(about = "Drive Firefox from the command line through the foxbridge host")]
#[command(version)]
struct Cli {
    /// Command socket path (defaults to the per-user runtime directory)
    #[clap(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the host and extension are reachable
    Ping,
    /// Report the host name and version
    Version,
    /// Navigate the active private tab to a URL
    Navigate {
        url: String,
    },
    /// Show the active tab
    ActiveTab,
    /// List all open tabs
    Tabs,
    /// Close a tab by id
    CloseTab {
        tab_id: i64,
    },
    /// Open a new window (private unless --normal is given)
    CreateWindow {
        /// Open a normal window instead of a private one
        #[clap(long)]
        normal: bool,
        /// URL to open in the new window
        #[clap(long)]
        url: Option<String>,
    },
    /// Close a window by id
    CloseWindow {
        window_id: i64,
    },
    /// List all open windows
    Windows,
    /// Read page text, optionally scoped to a CSS selector
    Content {
        selector: Option<String>,
    },
    /// Click the element matching a CSS selector
    Click {
        selector: String,
    },
    /// Type text into the element matching a CSS selector
    Type {
        selector: String,
        text: String,
        /// Append to the existing value instead of replacing it
        #[clap(long)]
        no_clear: bool,
    },
    /// Capture the visible page as a PNG data URL
    Screenshot,
}

impl Commands {
    /// The wire command name and parameters for this invocation.
    fn to_wire(&self) -> (&'static str, Value) {
        match self {
            Commands::Ping => ("ping", json!({})),
            Commands::Version => ("version", json!({})),
            Commands::Navigate { url } => ("navigate", json!({ "url": url })),
            Commands::ActiveTab => ("getActiveTab", json!({})),
            Commands::Tabs => ("getTabs", json!({})),
            Commands::CloseTab { tab_id } => ("closeTab", json!({ "tabId": tab_id })),
            Commands::CreateWindow { normal, url } => {
                let mut params = json!({ "private": !normal });
                if let Some(url) = url {
                    params["url"] = json!(url);
                }
                ("createWindow", params)
            }
            Commands::CloseWindow { window_id } => {
                ("closeWindow", json!({ "windowId": window_id }))
            }
            Commands::Windows => ("getWindows", json!({})),
            Commands::Content { selector } => match selector {
                Some(selector) => ("getContent", json!({ "selector": selector })),
                None => ("getContent", json!({})),
            },
            Commands::Click { selector } => ("click", json!({ "selector": selector })),
            Commands::Type {
                selector,
                text,
                no_clear,
            } => (
                "type",
                json!({ "selector": selector, "text": text, "clear": !no_clear }),
            ),
            Commands::Screenshot => ("screenshot", json!({})),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let socket_path = cli.socket.unwrap_or_else(ipc::socket_path);
    let (command, params) = cli.command.to_wire();

    match client::send_command(&socket_path, command, params).await {
        Ok(response) if response.success => {
            let result = response.result.unwrap_or(Value::Null);
            match serde_json::to_string_pretty(&result) {
                Ok(pretty) => println!("{pretty}"),
                Err(_) => println!("{result}"),
            }
            ExitCode::SUCCESS
        }
        Ok(response) => {
            let message = response.error.unwrap_or_else(|| "Unknown error".to_string());
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
