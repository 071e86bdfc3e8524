//! Socket server tests: end-to-end exchanges over a real unix socket.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use super::MockBrowser;
use crate::client;
use crate::dispatch::Dispatcher;
use crate::errors::RelayError;
use crate::multiplexer::RequestMultiplexer;
use crate::protocol::FramedChannel;
use crate::server::{CommandServer, CommandSink};

fn start_server<S: CommandSink + 'static>(sink: Arc<S>) -> (PathBuf, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("foxbridge.sock");
    let server = CommandServer::bind(&path).expect("bind");
    tokio::spawn(server.run(sink));
    (path, dir)
}

#[tokio::test]
async fn test_ping_round_trip_over_the_socket() {
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(MockBrowser::with_private_window())));
    let (path, _dir) = start_server(dispatcher);

    let response = client::send_command(&path, "ping", json!({}))
        .await
        .expect("exchange");
    assert!(response.success);
    let result = response.result.expect("result");
    assert_eq!(result["pong"], json!(true));
}

#[tokio::test]
async fn test_command_failures_come_back_as_structured_responses() {
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(MockBrowser::with_normal_window())));
    let (path, _dir) = start_server(dispatcher);

    let response = client::send_command(&path, "screenshot", json!({}))
        .await
        .expect("exchange");
    assert!(!response.success);
    let error = response.error.expect("error text");
    assert!(error.contains("private window"), "got: {error}");
}

#[tokio::test]
async fn test_malformed_request_line_gets_an_error_and_spares_the_server() {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(MockBrowser::with_private_window())));
    let (path, _dir) = start_server(dispatcher);

    let stream = tokio::net::UnixStream::connect(&path).await.expect("connect");
    let (read_half, mut write_half) = tokio::io::split(stream);
    write_half.write_all(b"this is not json\n").await.expect("write");
    let mut line = String::new();
    BufReader::new(read_half)
        .read_line(&mut line)
        .await
        .expect("read");
    let response: crate::protocol::WireResponse =
        serde_json::from_str(line.trim()).expect("response shape");
    assert!(!response.success);
    assert!(response.error.expect("error").contains("invalid request"));

    // The next connection is served normally.
    let response = client::send_command(&path, "ping", json!({}))
        .await
        .expect("exchange");
    assert!(response.success);
}

#[tokio::test]
async fn test_socket_file_is_owner_only() {
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(MockBrowser::new())));
    let (path, _dir) = start_server(dispatcher);

    let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn test_bind_replaces_a_stale_socket_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("foxbridge.sock");
    // A dead socket left behind by an earlier host.
    drop(std::os::unix::net::UnixListener::bind(&path).expect("stale bind"));

    let server = CommandServer::bind(&path).expect("rebind over stale socket");
    assert_eq!(server.local_path(), path.as_path());
}

/// A sink that accepts the request and then never answers.
struct StalledSink;

#[async_trait::async_trait]
impl CommandSink for StalledSink {
    async fn handle(
        &self,
        _command: &str,
        _params: serde_json::Value,
    ) -> Result<serde_json::Value, RelayError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_exchange_without_response_times_out_without_phantom_id() {
    let (path, _dir) = start_server(Arc::new(StalledSink));

    let err = client::send_command(&path, "ping", json!({}))
        .await
        .expect_err("stalled host");
    match &err {
        RelayError::SocketTimeout { secs } => assert_eq!(*secs, 30),
        other => panic!("expected exchange timeout, got {other:?}"),
    }
    assert_eq!(err.to_string(), "no response from host after 30s");
}

#[tokio::test]
async fn test_connect_error_names_the_missing_host() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.sock");
    let err = client::send_command(&path, "ping", json!({}))
        .await
        .expect_err("no host");
    match err {
        RelayError::ConnectFailed(reason) => assert!(reason.contains("host not running")),
        other => panic!("expected connect failure, got {other:?}"),
    }
}

/// Full relay path: socket client, server, multiplexer, framed channel,
/// dispatcher over the in-memory browser. The same bytes-on-the-wire shape
/// the real deployment uses, minus Firefox.
#[tokio::test]
async fn test_three_hop_relay_end_to_end() {
    let (host_side, ext_side) = tokio::io::duplex(1 << 16);

    let browser = Arc::new(MockBrowser::with_private_window());
    let dispatcher = Dispatcher::new(browser.clone());
    tokio::spawn(async move {
        let (read, write) = tokio::io::split(ext_side);
        let channel = FramedChannel::new(read, write);
        let (reader, writer) = channel.into_split();
        let _ = dispatcher.run_channel(reader, writer).await;
    });

    let mux = Arc::new(RequestMultiplexer::new());
    let (host_read, host_write) = tokio::io::split(host_side);
    mux.attach(FramedChannel::boxed(host_read, host_write)).await;
    let (path, _dir) = start_server(mux.clone());

    let response = client::send_command(&path, "navigate", json!({ "url": "https://example.com" }))
        .await
        .expect("exchange");
    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(response.result.expect("result")["url"], json!("https://example.com"));
    assert_eq!(browser.navigations().len(), 1);

    // Gated refusals survive the full round trip as structured errors.
    browser.add_window(false);
    let response = client::send_command(&path, "screenshot", json!({}))
        .await
        .expect("exchange");
    assert!(!response.success);
    assert!(response.error.expect("error").contains("private window"));
}
