//! Correlation-id request multiplexer.
//!
//! The host writes `{id, command, params}` frames at the browser and the
//! extension answers with `{id, success, result|error}` frames, in whatever
//! order its own work completes. This module owns the single channel and the
//! pending-request table that pairs them back up. Correctness depends only
//! on id matching, never on arrival order.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, warn};

use crate::errors::RelayError;
use crate::protocol::{BoxReader, BoxWriter, FrameReader, FrameWriter, FramedChannel, WireRequest, WireResponse};

/// Per-request response deadline, matching the extension's own 30 s policy.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type PendingReply = oneshot::Sender<Result<Value, RelayError>>;

pub type ConnectFuture =
    Pin<Box<dyn Future<Output = std::io::Result<FramedChannel<BoxReader, BoxWriter>>> + Send>>;

/// Factory invoked for the single reconnect attempt when `send` finds no
/// live channel.
pub type Connector = Box<dyn Fn() -> ConnectFuture + Send + Sync>;

struct MuxState {
    next_id: u64,
    /// Channel generation; bumped on every attach so a stale reader's
    /// disconnect cannot tear down a replacement channel's writer.
    generation: u64,
    pending: HashMap<u64, PendingReply>,
    writer: Option<mpsc::UnboundedSender<WireRequest>>,
    connected_tx: watch::Sender<bool>,
}

impl MuxState {
    fn disconnect(&mut self, generation: u64, reason: &str) {
        // A pump from a superseded channel must not touch anything here:
        // the pending table belongs to the current generation.
        if self.generation != generation {
            debug!(generation, reason, "ignoring disconnect from stale channel");
            return;
        }
        self.writer = None;
        let _ = self.connected_tx.send(false);
        if self.pending.is_empty() {
            return;
        }
        warn!(
            pending = self.pending.len(),
            reason, "channel lost, rejecting all pending requests"
        );
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(RelayError::Disconnected(reason.to_string())));
        }
    }
}

/// Maps each in-flight request to exactly one future result.
///
/// Owned instance, no ambient globals: tests run several multiplexers side
/// by side over in-memory ducts.
pub struct RequestMultiplexer {
    state: Arc<Mutex<MuxState>>,
    connector: Option<Connector>,
    timeout: Duration,
}

impl Default for RequestMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMultiplexer {
    pub fn new() -> Self {
        let (connected_tx, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(MuxState {
                next_id: 0,
                generation: 0,
                pending: HashMap::new(),
                writer: None,
                connected_tx,
            })),
            connector: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_connector(connector: Connector) -> Self {
        let mut mux = Self::new();
        mux.connector = Some(connector);
        mux
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach a channel and start pumping it. A no-op when already
    /// connected; the existing channel is never replaced out from under its
    /// pending requests.
    pub async fn attach(&self, channel: FramedChannel<BoxReader, BoxWriter>) {
        let mut st = self.state.lock().await;
        if st.writer.is_some() {
            debug!("attach ignored, channel already connected");
            return;
        }
        st.generation += 1;
        let generation = st.generation;
        let (reader, writer) = channel.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        st.writer = Some(tx);
        let _ = st.connected_tx.send(true);
        drop(st);

        tokio::spawn(write_pump(writer, rx, self.state.clone(), generation));
        tokio::spawn(read_pump(reader, self.state.clone(), generation));
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.writer.is_some()
    }

    /// Number of requests currently awaiting a response.
    pub async fn pending_requests(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Resolves once the current channel is gone (or immediately when none
    /// is attached). The host binary uses this to exit with the browser.
    pub async fn disconnected(&self) {
        let mut rx = self.state.lock().await.connected_tx.subscribe();
        loop {
            if !*rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Send one command and wait for its correlated response.
    pub async fn send(&self, command: &str, params: Value) -> Result<Value, RelayError> {
        self.send_with_timeout(command, params, self.timeout).await
    }

    pub async fn send_with_timeout(
        &self,
        command: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, RelayError> {
        let mut st = self.state.lock().await;
        if st.writer.is_none() {
            drop(st);
            self.reconnect_once().await?;
            st = self.state.lock().await;
        }
        let writer = match &st.writer {
            Some(writer) => writer.clone(),
            // Reconnect raced a second disconnect; reject without
            // registering anything.
            None => return Err(RelayError::ConnectFailed("no channel".into())),
        };

        st.next_id += 1;
        let id = st.next_id;
        let (tx, rx) = oneshot::channel();
        st.pending.insert(id, tx);
        drop(st);

        let request = WireRequest {
            id: Some(id),
            command: command.to_string(),
            params,
        };
        debug!(id, command, "sending request to native host");
        if writer.send(request).is_err() {
            self.state.lock().await.pending.remove(&id);
            return Err(RelayError::Disconnected("write pump gone".into()));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            // The sender only drops without answering when the table entry
            // was evicted some other way; treat it as a disconnect.
            Ok(Err(_)) => Err(RelayError::Disconnected("reply dropped".into())),
            Err(_) => {
                self.state.lock().await.pending.remove(&id);
                Err(RelayError::Timeout {
                    id,
                    secs: timeout.as_secs(),
                })
            }
        }
    }

    async fn reconnect_once(&self) -> Result<(), RelayError> {
        let Some(connector) = &self.connector else {
            return Err(RelayError::ConnectFailed("no channel".into()));
        };
        match connector().await {
            Ok(channel) => {
                self.attach(channel).await;
                Ok(())
            }
            Err(e) => Err(RelayError::ConnectFailed(e.to_string())),
        }
    }
}

/// Relay mode: socket commands are forwarded across the framed channel and
/// answered by the extension.
#[async_trait::async_trait]
impl crate::server::CommandSink for RequestMultiplexer {
    async fn handle(&self, command: &str, params: Value) -> Result<Value, RelayError> {
        self.send(command, params).await
    }
}

async fn write_pump(
    mut writer: FrameWriter<BoxWriter>,
    mut rx: mpsc::UnboundedReceiver<WireRequest>,
    state: Arc<Mutex<MuxState>>,
    generation: u64,
) {
    while let Some(request) = rx.recv().await {
        if let Err(e) = writer.write_message(&request).await {
            // A failed or partial write desyncs the frame stream; treat the
            // channel as dead.
            state
                .lock()
                .await
                .disconnect(generation, &format!("write failed: {e}"));
            return;
        }
    }
}

async fn read_pump(
    mut reader: FrameReader<BoxReader>,
    state: Arc<Mutex<MuxState>>,
    generation: u64,
) {
    let reason = loop {
        match reader.read_message().await {
            Ok(Some(message)) => {
                let response: WireResponse = match serde_json::from_value(message) {
                    Ok(response) => response,
                    Err(e) => {
                        debug!(error = %e, "ignoring non-response frame");
                        continue;
                    }
                };
                dispatch_response(&state, response).await;
            }
            Ok(None) => break "end of stream".to_string(),
            Err(e) => break e.to_string(),
        }
    };
    state.lock().await.disconnect(generation, &reason);
}

async fn dispatch_response(state: &Mutex<MuxState>, response: WireResponse) {
    let Some(id) = response.id else {
        debug!("dropping response without id");
        return;
    };
    let Some(tx) = state.lock().await.pending.remove(&id) else {
        // Late, duplicate, or unknown id. Must not corrupt unrelated state,
        // so it is dropped rather than treated as an error.
        debug!(id, "dropping response with no pending request");
        return;
    };
    let result = if response.success {
        Ok(response.result.unwrap_or(Value::Null))
    } else {
        Err(RelayError::Browser(
            response.error.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    };
    let _ = tx.send(result);
}
