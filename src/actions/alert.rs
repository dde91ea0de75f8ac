use anyhow::Context;
use chromiumoxide::page::Page;

use crate::error::RunError;

// Recorded in the page so a native dialog never blocks the CDP connection:
// alert() is captured, confirm() is captured and auto-accepted.
const HOOK_JS: &str = r#"(() => {
    if (window.__e2eDialogs) { return true; }
    window.__e2eDialogs = [];
    const record = (message) => { window.__e2eDialogs.push(String(message)); };
    window.alert = record;
    window.confirm = (message) => { record(message); return true; };
    return true;
})()"#;

const TAKE_JS: &str = r#"(() => {
    const queue = window.__e2eDialogs;
    if (!queue || queue.length === 0) { return null; }
    return queue.shift();
})()"#;

/// Install the dialog hook into the current document. Idempotent; must be
/// re-applied after a navigation replaces the document.
pub async fn install_dialog_hook(page: &Page) -> Result<(), RunError> {
    page.evaluate(HOOK_JS)
        .await
        .context("failed to install dialog hook")?;
    Ok(())
}

/// Consume the oldest recorded dialog message, if any.
pub async fn take_alert(page: &Page) -> Result<Option<String>, RunError> {
    let message: Option<String> = page
        .evaluate(TAKE_JS)
        .await
        .context("failed to read dialog queue")?
        .into_value()
        .context("failed to parse dialog message")?;
    Ok(message)
}
