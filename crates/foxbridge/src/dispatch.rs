//! Command dispatcher: the extension-side half of the relay contract.
//!
//! Takes a command by name, decodes it, runs the security gate for gated
//! commands, executes the effect against the [`Browser`] seam, and folds
//! every failure into a structured `{success:false, error}` response at the
//! boundary. Handlers can fail; they can never take the dispatcher down.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::browser::{Browser, PageAction};
use crate::commands::Command;
use crate::errors::{ProtocolError, RelayError};
use crate::protocol::{FrameReader, FrameWriter, WireRequest, WireResponse};
use crate::security;

pub struct Dispatcher<B: Browser> {
    browser: Arc<B>,
}

impl<B: Browser> Dispatcher<B> {
    pub fn new(browser: Arc<B>) -> Self {
        Self { browser }
    }

    /// Execute one command, returning the raw result or the error that
    /// stopped it.
    pub async fn call(&self, command: &str, params: Value) -> Result<Value, RelayError> {
        let command = Command::parse(command, params)?;
        debug!(command = command.name(), "dispatching");

        // Gate before any effect. The gate resolves the active tab, which
        // page-touching handlers also need as their target.
        let gated_tab = if command.requires_private_window() {
            Some(security::require_private_window(self.browser.as_ref(), command.name()).await?)
        } else {
            None
        };

        match command {
            Command::Ping => Ok(json!({ "pong": true, "timestamp": epoch_millis() })),
            Command::Version => Ok(json!({
                "host": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            })),
            Command::Navigate { url } => {
                let tab = gated_tab.ok_or(RelayError::NoActiveTab)?;
                self.browser.navigate(tab.tab_id, &url).await?;
                Ok(json!({ "tabId": tab.tab_id, "url": url }))
            }
            Command::GetActiveTab => {
                let tab = self.browser.active_tab().await?;
                Ok(serde_json::to_value(tab).map_err(ProtocolError::Json)?)
            }
            Command::GetTabs => {
                let tabs = self.browser.tabs().await?;
                Ok(serde_json::to_value(tabs).map_err(ProtocolError::Json)?)
            }
            Command::CloseTab { tab_id } => {
                self.browser.close_tab(tab_id).await?;
                Ok(json!({ "closed": true, "tabId": tab_id }))
            }
            Command::CreateWindow { private, url } => {
                let window = self
                    .browser
                    .create_window(private, url.as_deref())
                    .await?;
                Ok(json!({ "windowId": window.window_id, "private": window.private }))
            }
            Command::CloseWindow { window_id } => {
                self.browser.close_window(window_id).await?;
                Ok(json!({ "closed": true, "windowId": window_id }))
            }
            Command::GetWindows => {
                let windows = self.browser.windows().await?;
                Ok(serde_json::to_value(windows).map_err(ProtocolError::Json)?)
            }
            Command::GetContent { selector } => {
                let tab = gated_tab.ok_or(RelayError::NoActiveTab)?;
                let action = PageAction::GetContent { selector };
                self.browser.page_action(tab.tab_id, &action).await
            }
            Command::Click { selector } => {
                let tab = gated_tab.ok_or(RelayError::NoActiveTab)?;
                let action = PageAction::Click { selector };
                self.browser.page_action(tab.tab_id, &action).await
            }
            Command::Type {
                selector,
                text,
                clear,
            } => {
                let tab = gated_tab.ok_or(RelayError::NoActiveTab)?;
                let action = PageAction::Type {
                    selector,
                    text,
                    clear,
                };
                self.browser.page_action(tab.tab_id, &action).await
            }
            Command::Screenshot => {
                let data_url = self.browser.capture_screenshot().await?;
                Ok(json!({ "dataUrl": data_url }))
            }
        }
    }

    /// Execute one command and fold the outcome into a wire response. This
    /// is the recovery boundary: nothing a handler does propagates past it.
    pub async fn dispatch(&self, command: &str, params: Value) -> WireResponse {
        match self.call(command, params).await {
            Ok(result) => WireResponse::ok(None, result),
            Err(e) => {
                warn!(command, error = %e, "command failed");
                WireResponse::err(None, e.to_string())
            }
        }
    }

    /// Serve request frames from a channel until it ends: read
    /// `{id, command, params}`, dispatch, answer with the id echoed back.
    /// Frames that are not requests are ignored; codec errors end the loop
    /// since the stream cannot be resynchronized.
    pub async fn run_channel<R, W>(
        &self,
        mut reader: FrameReader<R>,
        mut writer: FrameWriter<W>,
    ) -> Result<(), ProtocolError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(message) = reader.read_message().await? {
            let request: WireRequest = match serde_json::from_value(message) {
                Ok(request) => request,
                Err(e) => {
                    debug!(error = %e, "ignoring non-request frame");
                    continue;
                }
            };
            let mut response = self.dispatch(&request.command, request.params).await;
            response.id = request.id;
            writer.write_message(&response).await?;
        }
        Ok(())
    }
}

/// Local mode: socket commands are executed directly against a browser
/// implementation, no framed hop in between.
#[async_trait::async_trait]
impl<B: Browser> crate::server::CommandSink for Dispatcher<B> {
    async fn handle(&self, command: &str, params: Value) -> Result<Value, RelayError> {
        self.call(command, params).await
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
