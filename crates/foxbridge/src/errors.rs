use thiserror::Error;

/// Errors raised by the framed channel codec.
///
/// Any of these is fatal to the channel that produced it: once frame sync is
/// lost mid-stream there is no way to find the next header, so the owner
/// treats the channel as disconnected.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended in the middle of a frame. Distinct from a clean EOF,
    /// which is only reported when zero bytes of the next header were read.
    #[error("unexpected EOF: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// Inbound frame header declared a length over the direction's ceiling.
    #[error("frame too large: {len} bytes (max {limit})")]
    FrameTooLarge { len: u64, limit: u64 },

    /// Outbound message would exceed the direction's ceiling. Raised before
    /// any byte is written, so no partial frame is ever observable.
    #[error("message too large: {len} bytes (max {limit})")]
    MessageTooLarge { len: usize, limit: usize },

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced to callers of the relay and dispatch layers.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The framed channel went away; carries the disconnect reason. Every
    /// request pending at that moment is rejected with this error.
    #[error("native host disconnected: {0}")]
    Disconnected(String),

    /// No channel existed and the single reconnect attempt failed.
    #[error("failed to connect to native host: {0}")]
    ConnectFailed(String),

    /// A framed request registered in the pending table overran its
    /// deadline; carries the correlation id that was evicted.
    #[error("request timed out after {secs}s")]
    Timeout { id: u64, secs: u64 },

    /// A one-shot socket exchange got no response line in time. This hop
    /// has no correlation ids; one connection is one exchange.
    #[error("no response from host after {secs}s")]
    SocketTimeout { secs: u64 },

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A gated command was issued while the active window is not private.
    #[error("{0} requires a private window")]
    NotPrivate(String),

    #[error("{0} is required")]
    MissingParam(&'static str),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("no active tab")]
    NoActiveTab,

    /// Failure reported by the browser's tab/window APIs.
    #[error("{0}")]
    Browser(String),

    /// Failure relayed from the page content script, passed through opaque.
    #[error("{0}")]
    Page(String),
}
