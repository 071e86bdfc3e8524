//! Native-messaging relay core for driving Firefox from outside the browser.
//!
//! A controller (CLI or MCP tool server) connects to a local socket, the
//! native-messaging host forwards each command over a length-prefixed framed
//! channel to the extension background script, and the extension dispatches
//! the command against the tab/window APIs or the page content script. This
//! crate implements the relay pieces that chain: the framed codec, the
//! correlation-id request multiplexer, the command socket server, and the
//! dispatch/security contract the extension side honors.

pub mod browser;
pub mod client;
pub mod commands;
pub mod dispatch;
pub mod errors;
pub mod ipc;
pub mod multiplexer;
pub mod protocol;
pub mod security;
pub mod server;
#[cfg(test)]
mod tests;

pub use browser::{Browser, PageAction, TabInfo, WindowInfo};
pub use commands::Command;
pub use dispatch::Dispatcher;
pub use errors::{ProtocolError, RelayError};
pub use multiplexer::{RequestMultiplexer, DEFAULT_REQUEST_TIMEOUT};
pub use protocol::{
    FramedChannel, WireRequest, WireResponse, MAX_INBOUND_FRAME, MAX_OUTBOUND_FRAME,
};
pub use server::{CommandServer, CommandSink};
