//! Tab, window, and page abstraction the dispatcher drives.
//!
//! On the extension side these calls land on the WebExtension tab/window
//! APIs and the content script; in tests they land on an in-memory model.
//! The dispatcher only ever sees this trait, which keeps the security gate
//! and command semantics testable without a browser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::RelayError;

/// Identifiers are opaque pass-through integers scoped to the browser
/// process.
pub type TabId = i64;
pub type WindowId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabInfo {
    #[serde(rename = "tabId")]
    pub tab_id: TabId,
    pub url: Option<String>,
    pub title: Option<String>,
    pub active: bool,
    #[serde(rename = "windowId")]
    pub window_id: WindowId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowInfo {
    #[serde(rename = "windowId")]
    pub window_id: WindowId,
    pub private: bool,
    pub focused: bool,
}

/// An action delegated to the page content script. The page's reply is
/// opaque data round-tripped into the response; it is never interpreted as
/// instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    GetContent { selector: Option<String> },
    Click { selector: String },
    Type { selector: String, text: String, clear: bool },
}

impl PageAction {
    pub fn name(&self) -> &'static str {
        match self {
            PageAction::GetContent { .. } => "getContent",
            PageAction::Click { .. } => "click",
            PageAction::Type { .. } => "type",
        }
    }

    /// Wire shape of the page-delegation sub-protocol: `{action, params}`.
    pub fn to_wire(&self) -> Value {
        match self {
            PageAction::GetContent { selector } => json!({
                "action": "getContent",
                "params": { "selector": selector },
            }),
            PageAction::Click { selector } => json!({
                "action": "click",
                "params": { "selector": selector },
            }),
            PageAction::Type { selector, text, clear } => json!({
                "action": "type",
                "params": { "selector": selector, "text": text, "clear": clear },
            }),
        }
    }
}

/// The browser surface the command dispatcher executes against.
#[async_trait]
pub trait Browser: Send + Sync {
    /// The active tab of the focused window, if any.
    async fn active_tab(&self) -> Result<Option<TabInfo>, RelayError>;

    async fn tabs(&self) -> Result<Vec<TabInfo>, RelayError>;

    async fn windows(&self) -> Result<Vec<WindowInfo>, RelayError>;

    /// Point an existing tab at a new URL.
    async fn navigate(&self, tab: TabId, url: &str) -> Result<(), RelayError>;

    async fn close_tab(&self, tab: TabId) -> Result<(), RelayError>;

    async fn create_window(
        &self,
        private: bool,
        url: Option<&str>,
    ) -> Result<WindowInfo, RelayError>;

    async fn close_window(&self, window: WindowId) -> Result<(), RelayError>;

    /// Privacy flag of a window. The security gate queries this fresh on
    /// every gated command; implementations must not cache it.
    async fn is_private_window(&self, window: WindowId) -> Result<bool, RelayError>;

    /// Capture the visible viewport as a PNG data URL.
    async fn capture_screenshot(&self) -> Result<String, RelayError>;

    /// Forward an action to the content script of `tab` and relay its
    /// structured result unchanged.
    async fn page_action(&self, tab: TabId, action: &PageAction) -> Result<Value, RelayError>;
}
