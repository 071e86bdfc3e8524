//! Command socket server.
//!
//! Accepts short-lived client connections on the local command channel.
//! Each connection carries exactly one newline-terminated JSON request and
//! receives exactly one JSON response line; no pipelining, no multiplexing
//! on this hop. Many connections may be in flight at once, all funneling
//! into the one upstream sink.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::errors::RelayError;
use crate::ipc;
use crate::protocol::{WireRequest, WireResponse};

/// Where a received command goes. The host binary plugs the request
/// multiplexer in here (relay toward the extension); tests plug a local
/// dispatcher in directly.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn handle(&self, command: &str, params: Value) -> Result<Value, RelayError>;
}

#[cfg(unix)]
pub struct CommandServer {
    listener: tokio::net::UnixListener,
    path: PathBuf,
}

#[cfg(unix)]
impl CommandServer {
    /// Bind the command channel, replacing any stale socket file and
    /// restricting it to the owning user.
    pub fn bind(path: &Path) -> std::io::Result<Self> {
        ipc::ensure_parent_dir(path)?;
        ipc::cleanup_socket(path);
        let listener = tokio::net::UnixListener::bind(path)?;
        ipc::set_secure_permissions(path);
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    pub fn local_path(&self) -> &Path {
        &self.path
    }

    /// Accept connections forever. A misbehaving client only ever costs its
    /// own connection; the accept loop survives everything.
    pub async fn run<S: CommandSink + 'static>(self, sink: Arc<S>) -> std::io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let sink = sink.clone();
                    tokio::spawn(async move {
                        serve_connection(stream, sink).await;
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }
}

#[cfg(windows)]
pub struct CommandServer {
    path: PathBuf,
}

#[cfg(windows)]
impl CommandServer {
    pub fn bind(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn local_path(&self) -> &Path {
        &self.path
    }

    /// Named-pipe accept loop: create an instance, wait for a client, hand
    /// the connected instance off, create the next one.
    pub async fn run<S: CommandSink + 'static>(self, sink: Arc<S>) -> std::io::Result<()> {
        use tokio::net::windows::named_pipe::ServerOptions;

        let name = self.path.to_string_lossy().to_string();
        let mut server = ServerOptions::new()
            .first_pipe_instance(true)
            .create(&name)?;
        loop {
            if let Err(e) = server.connect().await {
                warn!(error = %e, "pipe connect failed");
                continue;
            }
            let connected = server;
            server = ServerOptions::new().create(&name)?;
            let sink = sink.clone();
            tokio::spawn(async move {
                serve_connection(connected, sink).await;
            });
        }
    }
}

/// Handle one request/response exchange, then close.
pub(crate) async fn serve_connection<T, S>(stream: T, sink: Arc<S>)
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: CommandSink,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    let response = match reader.read_line(&mut line).await {
        // Client went away before sending anything; nothing to answer.
        Ok(0) => return,
        Ok(_) => match serde_json::from_str::<WireRequest>(line.trim()) {
            Ok(request) => {
                debug!(command = %request.command, "socket request");
                match sink.handle(&request.command, request.params).await {
                    Ok(result) => WireResponse::ok(None, result),
                    Err(e) => WireResponse::err(None, e.to_string()),
                }
            }
            Err(e) => WireResponse::err(None, format!("invalid request: {e}")),
        },
        Err(e) => WireResponse::err(None, format!("read failed: {e}")),
    };

    let mut payload = match serde_json::to_string(&response) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "response not serializable");
            return;
        }
    };
    payload.push('\n');
    if let Err(e) = write_half.write_all(payload.as_bytes()).await {
        debug!(error = %e, "client closed before response");
    }
    let _ = write_half.shutdown().await;
}
