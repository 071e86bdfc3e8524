//! MCP tool surface over the command socket.
//!
//! Every tool call opens one short-lived connection to the host, exactly
//! like the CLI does. Command failures come back as error-flagged tool
//! content, not protocol errors, so the model can read and react to them.

use std::path::PathBuf;

use foxbridge::client;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateWindowArgs {
    /// Open a private window. Defaults to true; page-level tools only work
    /// in private windows.
    pub private: Option<bool>,
    /// URL to open in the new window.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NavigateArgs {
    /// Absolute URL to load in the active private-window tab.
    pub url: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetContentArgs {
    /// CSS selector to scope the extraction; omit for the whole page.
    pub selector: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClickArgs {
    /// CSS selector of the element to click.
    pub selector: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TypeArgs {
    /// CSS selector of the input element.
    pub selector: String,
    /// Text to type.
    pub text: String,
    /// Clear the existing value first. Defaults to true.
    pub clear: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTabsArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CloseWindowArgs {
    /// Id of the window to close.
    #[serde(rename = "windowId")]
    pub window_id: i64,
}

pub struct FirefoxAgent {
    socket_path: PathBuf,
    tool_router: ToolRouter<Self>,
}

impl FirefoxAgent {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            tool_router: Self::tool_router(),
        }
    }

    /// One socket round trip. Ok carries the command result; Err carries a
    /// message meant for the model, whether the command or the transport
    /// failed.
    async fn relay(&self, command: &str, params: Value) -> Result<Value, String> {
        debug!(command, "relaying tool call");
        match client::send_command(&self.socket_path, command, params).await {
            Ok(response) if response.success => Ok(response.result.unwrap_or(Value::Null)),
            Ok(response) => Err(response
                .error
                .unwrap_or_else(|| "Unknown error".to_string())),
            Err(e) => Err(e.to_string()),
        }
    }
}

fn json_result(outcome: Result<Value, String>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(result) => Ok(CallToolResult::success(vec![Content::json(result)?])),
        Err(message) => Ok(CallToolResult::error(vec![Content::text(message)])),
    }
}

#[tool_router]
impl FirefoxAgent {
    #[tool(
        description = "Open a new Firefox window. Private by default; page tools (navigate, content, click, type, screenshot) only work while a private window is focused."
    )]
    pub async fn firefox_create_window(
        &self,
        Parameters(args): Parameters<CreateWindowArgs>,
    ) -> Result<CallToolResult, McpError> {
        let mut params = json!({ "private": args.private.unwrap_or(true) });
        if let Some(url) = args.url {
            params["url"] = json!(url);
        }
        json_result(self.relay("createWindow", params).await)
    }

    #[tool(description = "Navigate the active private-window tab to a URL.")]
    pub async fn firefox_navigate(
        &self,
        Parameters(args): Parameters<NavigateArgs>,
    ) -> Result<CallToolResult, McpError> {
        json_result(self.relay("navigate", json!({ "url": args.url })).await)
    }

    #[tool(
        description = "Read text content from the current page, optionally scoped to a CSS selector."
    )]
    pub async fn firefox_get_content(
        &self,
        Parameters(args): Parameters<GetContentArgs>,
    ) -> Result<CallToolResult, McpError> {
        let params = match args.selector {
            Some(selector) => json!({ "selector": selector }),
            None => json!({}),
        };
        json_result(self.relay("getContent", params).await)
    }

    #[tool(description = "Click the element matching a CSS selector on the current page.")]
    pub async fn firefox_click(
        &self,
        Parameters(args): Parameters<ClickArgs>,
    ) -> Result<CallToolResult, McpError> {
        json_result(
            self.relay("click", json!({ "selector": args.selector }))
                .await,
        )
    }

    #[tool(
        description = "Type text into the element matching a CSS selector. Clears the existing value unless clear is false."
    )]
    pub async fn firefox_type(
        &self,
        Parameters(args): Parameters<TypeArgs>,
    ) -> Result<CallToolResult, McpError> {
        let params = json!({
            "selector": args.selector,
            "text": args.text,
            "clear": args.clear.unwrap_or(true),
        });
        json_result(self.relay("type", params).await)
    }

    #[tool(description = "Capture the visible page as a PNG image.")]
    pub async fn firefox_screenshot(&self) -> Result<CallToolResult, McpError> {
        match self.relay("screenshot", json!({})).await {
            Ok(result) => {
                let data_url = result["dataUrl"].as_str().unwrap_or_default();
                let base64_data = data_url
                    .strip_prefix(PNG_DATA_URL_PREFIX)
                    .unwrap_or(data_url);
                Ok(CallToolResult::success(vec![Content::image(
                    base64_data.to_string(),
                    "image/png".to_string(),
                )]))
            }
            Err(message) => Ok(CallToolResult::error(vec![Content::text(message)])),
        }
    }

    #[tool(description = "List all open tabs with their ids, URLs, and titles.")]
    pub async fn firefox_get_tabs(
        &self,
        Parameters(_args): Parameters<GetTabsArgs>,
    ) -> Result<CallToolResult, McpError> {
        json_result(self.relay("getTabs", json!({})).await)
    }

    #[tool(description = "Close a Firefox window by id.")]
    pub async fn firefox_close_window(
        &self,
        Parameters(args): Parameters<CloseWindowArgs>,
    ) -> Result<CallToolResult, McpError> {
        json_result(
            self.relay("closeWindow", json!({ "windowId": args.window_id }))
                .await,
        )
    }
}

#[tool_handler]
impl ServerHandler for FirefoxAgent {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Controls a running Firefox through its native-messaging host. \
                 Open a private window with firefox_create_window first; navigation \
                 and page interaction are refused outside private windows."
                    .to_string(),
            ),
        }
    }
}
