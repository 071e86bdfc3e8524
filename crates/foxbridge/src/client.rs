//! One-shot command-channel client, shared by the CLI and the MCP agent.
//!
//! Connect, write one `{command, params}` line, read one response line,
//! close. Connection failures map to messages a user can act on instead of
//! raw errno text.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use crate::errors::RelayError;
use crate::protocol::{WireRequest, WireResponse};

const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Send one command to the host and return its response. `success: false`
/// responses are returned as-is; this only errors when the exchange itself
/// fails.
pub async fn send_command(
    socket_path: &Path,
    command: &str,
    params: Value,
) -> Result<WireResponse, RelayError> {
    match tokio::time::timeout(IO_TIMEOUT, exchange(socket_path, command, params)).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::SocketTimeout {
            secs: IO_TIMEOUT.as_secs(),
        }),
    }
}

#[cfg(unix)]
async fn connect(path: &Path) -> std::io::Result<tokio::net::UnixStream> {
    tokio::net::UnixStream::connect(path).await
}

#[cfg(windows)]
async fn connect(
    path: &Path,
) -> std::io::Result<tokio::net::windows::named_pipe::NamedPipeClient> {
    tokio::net::windows::named_pipe::ClientOptions::new().open(path.as_os_str())
}

async fn exchange(
    socket_path: &Path,
    command: &str,
    params: Value,
) -> Result<WireResponse, RelayError> {
    let stream = connect(socket_path).await.map_err(|e| friendly_connect_error(&e))?;
    let (read_half, mut write_half) = tokio::io::split(stream);

    let request = WireRequest {
        id: None,
        command: command.to_string(),
        params,
    };
    let mut line =
        serde_json::to_string(&request).map_err(|e| RelayError::InvalidParams(e.to_string()))?;
    line.push('\n');
    write_half
        .write_all(line.as_bytes())
        .await
        .map_err(|e| RelayError::Disconnected(e.to_string()))?;

    let mut reader = BufReader::new(read_half);
    let mut reply = String::new();
    let n = reader
        .read_line(&mut reply)
        .await
        .map_err(|e| RelayError::Disconnected(e.to_string()))?;
    if n == 0 {
        return Err(RelayError::Disconnected(
            "host closed the connection without replying".to_string(),
        ));
    }

    serde_json::from_str(reply.trim())
        .map_err(|e| RelayError::Disconnected(format!("invalid response from host: {e}")))
}

fn friendly_connect_error(e: &std::io::Error) -> RelayError {
    match e.kind() {
        std::io::ErrorKind::NotFound => RelayError::ConnectFailed(
            "host not running. Make sure Firefox is open with the extension loaded".to_string(),
        ),
        std::io::ErrorKind::ConnectionRefused => RelayError::ConnectFailed(
            "connection refused. Reload the extension to restart the host".to_string(),
        ),
        _ => RelayError::ConnectFailed(e.to_string()),
    }
}
