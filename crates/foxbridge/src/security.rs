//! Private-window security gate.
//!
//! Page-touching commands only ever run against a private window. The check
//! is a pure function of browser state at evaluation time: resolve the
//! active tab, resolve its owning window, ask for the privacy flag. It is
//! re-evaluated on every gated command because the active tab can change
//! between two commands issued moments apart; nothing here is cached and
//! there is no escalation path. The caller satisfies the gate by creating
//! or switching to a private window first.

use crate::browser::{Browser, TabInfo};
use crate::errors::RelayError;

/// Confirm the active tab lives in a private window, returning that tab so
/// the caller can target it. Denies with a [`RelayError::NotPrivate`]
/// naming the command otherwise; no side effect has run at that point.
pub async fn require_private_window<B: Browser + ?Sized>(
    browser: &B,
    command: &str,
) -> Result<TabInfo, RelayError> {
    let tab = browser
        .active_tab()
        .await?
        .ok_or(RelayError::NoActiveTab)?;
    if browser.is_private_window(tab.window_id).await? {
        Ok(tab)
    } else {
        Err(RelayError::NotPrivate(command.to_string()))
    }
}
