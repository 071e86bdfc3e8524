//! The command surface.
//!
//! Commands travel the wire as a generic `{command, params}` pair and are
//! decoded into a closed enumeration at the dispatch boundary. There is no
//! dynamic code execution anywhere in the protocol: the enumeration below
//! is the entire vocabulary, and everything else in a message is data.

use serde::Deserialize;
use serde_json::Value;

use crate::browser::{TabId, WindowId};
use crate::errors::RelayError;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping,
    Version,
    Navigate { url: String },
    GetActiveTab,
    GetTabs,
    CloseTab { tab_id: TabId },
    CreateWindow { private: bool, url: Option<String> },
    CloseWindow { window_id: WindowId },
    GetWindows,
    GetContent { selector: Option<String> },
    Click { selector: String },
    Type { selector: String, text: String, clear: bool },
    Screenshot,
}

#[derive(Debug, Default, Deserialize)]
struct NavigateParams {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CloseTabParams {
    #[serde(rename = "tabId")]
    tab_id: Option<TabId>,
}

#[derive(Debug, Default, Deserialize)]
struct CreateWindowParams {
    private: Option<bool>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CloseWindowParams {
    #[serde(rename = "windowId")]
    window_id: Option<WindowId>,
}

#[derive(Debug, Default, Deserialize)]
struct SelectorParams {
    selector: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TypeParams {
    selector: Option<String>,
    text: Option<String>,
    clear: Option<bool>,
}

fn decode<T: for<'de> Deserialize<'de> + Default>(params: Value) -> Result<T, RelayError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(|e| RelayError::InvalidParams(e.to_string()))
}

impl Command {
    /// Decode a named command and its parameter bag. Unknown names and
    /// missing required parameters fail here, before any effect runs.
    pub fn parse(command: &str, params: Value) -> Result<Self, RelayError> {
        match command {
            "ping" => Ok(Command::Ping),
            "version" => Ok(Command::Version),
            "navigate" => {
                let p: NavigateParams = decode(params)?;
                let url = p.url.ok_or(RelayError::MissingParam("url"))?;
                Ok(Command::Navigate { url })
            }
            "getActiveTab" => Ok(Command::GetActiveTab),
            "getTabs" => Ok(Command::GetTabs),
            "closeTab" => {
                let p: CloseTabParams = decode(params)?;
                let tab_id = p.tab_id.ok_or(RelayError::MissingParam("tabId"))?;
                Ok(Command::CloseTab { tab_id })
            }
            "createWindow" => {
                let p: CreateWindowParams = decode(params)?;
                Ok(Command::CreateWindow {
                    // Private is the point of this tool; opting out is
                    // explicit.
                    private: p.private.unwrap_or(true),
                    url: p.url,
                })
            }
            "closeWindow" => {
                let p: CloseWindowParams = decode(params)?;
                let window_id = p.window_id.ok_or(RelayError::MissingParam("windowId"))?;
                Ok(Command::CloseWindow { window_id })
            }
            "getWindows" => Ok(Command::GetWindows),
            "getContent" => {
                let p: SelectorParams = decode(params)?;
                Ok(Command::GetContent {
                    selector: p.selector,
                })
            }
            "click" => {
                let p: SelectorParams = decode(params)?;
                let selector = p.selector.ok_or(RelayError::MissingParam("selector"))?;
                Ok(Command::Click { selector })
            }
            "type" => {
                let p: TypeParams = decode(params)?;
                let selector = p.selector.ok_or(RelayError::MissingParam("selector"))?;
                let text = p.text.ok_or(RelayError::MissingParam("text"))?;
                Ok(Command::Type {
                    selector,
                    text,
                    clear: p.clear.unwrap_or(true),
                })
            }
            "screenshot" => Ok(Command::Screenshot),
            other => Err(RelayError::UnknownCommand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Version => "version",
            Command::Navigate { .. } => "navigate",
            Command::GetActiveTab => "getActiveTab",
            Command::GetTabs => "getTabs",
            Command::CloseTab { .. } => "closeTab",
            Command::CreateWindow { .. } => "createWindow",
            Command::CloseWindow { .. } => "closeWindow",
            Command::GetWindows => "getWindows",
            Command::GetContent { .. } => "getContent",
            Command::Click { .. } => "click",
            Command::Type { .. } => "type",
            Command::Screenshot => "screenshot",
        }
    }

    /// Static security declaration: page-touching commands only run inside a
    /// private window. Declared here, enforced by the gate on every
    /// dispatch.
    pub fn requires_private_window(&self) -> bool {
        matches!(
            self,
            Command::Navigate { .. }
                | Command::GetContent { .. }
                | Command::Click { .. }
                | Command::Type { .. }
                | Command::Screenshot
        )
    }
}
