//! In-memory browser model backing the dispatcher and relay tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::browser::{Browser, PageAction, TabId, TabInfo, WindowId, WindowInfo};
use crate::errors::RelayError;

#[derive(Debug, Clone)]
pub struct PageElement {
    pub text: String,
    pub editable: bool,
    pub value: String,
}

#[derive(Default)]
struct BrowserState {
    windows: Vec<WindowInfo>,
    tabs: Vec<TabInfo>,
    elements: HashMap<String, PageElement>,
    navigations: Vec<(TabId, String)>,
    next_id: i64,
}

#[derive(Default)]
pub struct MockBrowser {
    state: Mutex<BrowserState>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A browser with one private window holding one active tab.
    pub fn with_private_window() -> Self {
        let browser = Self::new();
        browser.add_window(true);
        browser
    }

    /// A browser with one ordinary window holding one active tab.
    pub fn with_normal_window() -> Self {
        let browser = Self::new();
        browser.add_window(false);
        browser
    }

    pub fn add_window(&self, private: bool) -> WindowId {
        let mut st = self.state.lock().unwrap();
        st.next_id += 1;
        let window_id = st.next_id;
        for w in &mut st.windows {
            w.focused = false;
        }
        st.windows.push(WindowInfo {
            window_id,
            private,
            focused: true,
        });
        st.next_id += 1;
        let tab_id = st.next_id;
        for t in &mut st.tabs {
            t.active = false;
        }
        st.tabs.push(TabInfo {
            tab_id,
            url: Some("about:blank".to_string()),
            title: Some("New Tab".to_string()),
            active: true,
            window_id,
        });
        window_id
    }

    /// Make the first tab of `window` the active one.
    pub fn focus_window(&self, window: WindowId) {
        let mut st = self.state.lock().unwrap();
        for w in &mut st.windows {
            w.focused = w.window_id == window;
        }
        for t in &mut st.tabs {
            t.active = t.window_id == window;
        }
    }

    pub fn add_element(&self, selector: &str, element: PageElement) {
        self.state
            .lock()
            .unwrap()
            .elements
            .insert(selector.to_string(), element);
    }

    pub fn navigations(&self) -> Vec<(TabId, String)> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn tab_count(&self) -> usize {
        self.state.lock().unwrap().tabs.len()
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn active_tab(&self) -> Result<Option<TabInfo>, RelayError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tabs
            .iter()
            .find(|t| t.active)
            .cloned())
    }

    async fn tabs(&self) -> Result<Vec<TabInfo>, RelayError> {
        Ok(self.state.lock().unwrap().tabs.clone())
    }

    async fn windows(&self) -> Result<Vec<WindowInfo>, RelayError> {
        Ok(self.state.lock().unwrap().windows.clone())
    }

    async fn navigate(&self, tab: TabId, url: &str) -> Result<(), RelayError> {
        let mut st = self.state.lock().unwrap();
        let entry = st
            .tabs
            .iter_mut()
            .find(|t| t.tab_id == tab)
            .ok_or_else(|| RelayError::Browser(format!("no tab with id {tab}")))?;
        entry.url = Some(url.to_string());
        st.navigations.push((tab, url.to_string()));
        Ok(())
    }

    async fn close_tab(&self, tab: TabId) -> Result<(), RelayError> {
        let mut st = self.state.lock().unwrap();
        let before = st.tabs.len();
        st.tabs.retain(|t| t.tab_id != tab);
        if st.tabs.len() == before {
            return Err(RelayError::Browser(format!("no tab with id {tab}")));
        }
        Ok(())
    }

    async fn create_window(
        &self,
        private: bool,
        url: Option<&str>,
    ) -> Result<WindowInfo, RelayError> {
        let window_id = self.add_window(private);
        if let Some(url) = url {
            let mut st = self.state.lock().unwrap();
            if let Some(tab) = st.tabs.iter_mut().find(|t| t.window_id == window_id) {
                tab.url = Some(url.to_string());
            }
        }
        let st = self.state.lock().unwrap();
        Ok(st
            .windows
            .iter()
            .find(|w| w.window_id == window_id)
            .cloned()
            .expect("window just created"))
    }

    async fn close_window(&self, window: WindowId) -> Result<(), RelayError> {
        let mut st = self.state.lock().unwrap();
        let before = st.windows.len();
        st.windows.retain(|w| w.window_id != window);
        if st.windows.len() == before {
            return Err(RelayError::Browser(format!("no window with id {window}")));
        }
        st.tabs.retain(|t| t.window_id != window);
        Ok(())
    }

    async fn is_private_window(&self, window: WindowId) -> Result<bool, RelayError> {
        self.state
            .lock()
            .unwrap()
            .windows
            .iter()
            .find(|w| w.window_id == window)
            .map(|w| w.private)
            .ok_or_else(|| RelayError::Browser(format!("no window with id {window}")))
    }

    async fn capture_screenshot(&self) -> Result<String, RelayError> {
        Ok("data:image/png;base64,iVBORw0KGgo=".to_string())
    }

    async fn page_action(&self, tab: TabId, action: &PageAction) -> Result<Value, RelayError> {
        let st = self.state.lock().unwrap();
        let tab = st
            .tabs
            .iter()
            .find(|t| t.tab_id == tab)
            .ok_or_else(|| RelayError::Browser(format!("no tab with id {tab}")))?;

        match action {
            PageAction::GetContent { selector: None } => Ok(json!({
                "url": tab.url,
                "title": tab.title,
                "text": "page body text",
            })),
            PageAction::GetContent {
                selector: Some(selector),
            } => {
                let element = st
                    .elements
                    .get(selector)
                    .ok_or_else(|| RelayError::Page(format!("Element not found: {selector}")))?;
                Ok(json!({ "selector": selector, "text": element.text }))
            }
            PageAction::Click { selector } => {
                if !st.elements.contains_key(selector) {
                    return Err(RelayError::Page(format!("Element not found: {selector}")));
                }
                Ok(json!({ "selector": selector, "clicked": true }))
            }
            PageAction::Type {
                selector,
                text,
                clear,
            } => {
                let element = st
                    .elements
                    .get(selector)
                    .ok_or_else(|| RelayError::Page(format!("Element not found: {selector}")))?;
                if !element.editable {
                    return Err(RelayError::Page(format!(
                        "Element is not editable: {selector}"
                    )));
                }
                let current = if *clear {
                    text.clone()
                } else {
                    format!("{}{}", element.value, text)
                };
                Ok(json!({
                    "selector": selector,
                    "typed": text,
                    "currentValue": current,
                }))
            }
        }
    }
}
