use chromiumoxide::page::Page;
use std::time::Duration;

use super::locate::Locator;
use crate::error::RunError;

const POLL_INTERVAL_MS: u64 = 100;

/// Wait up to `timeout` for the locator to resolve to an element.
pub async fn wait_for(page: &Page, locator: &Locator, timeout: Duration) -> Result<(), RunError> {
    let check = format!(
        "(() => {{ const el = {}; return el !== null && el !== undefined; }})()",
        locator.to_js()?
    );
    poll(page, &check, timeout).await.map_err(|timeout_ms| {
        RunError::ElementNotFound {
            locator: locator.to_string(),
            timeout_ms,
        }
    })
}

/// Wait up to `timeout` for the located element to become visible: non-zero
/// box, not display:none, not visibility:hidden, not fully transparent.
pub async fn wait_visible(page: &Page, locator: &Locator, timeout: Duration) -> Result<(), RunError> {
    let check = format!(
        r#"(() => {{
            const el = {};
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            if (rect.width === 0 && rect.height === 0) return false;
            const style = getComputedStyle(el);
            return style.display !== 'none'
                && style.visibility !== 'hidden'
                && parseFloat(style.opacity) !== 0;
        }})()"#,
        locator.to_js()?
    );
    poll(page, &check, timeout).await.map_err(|timeout_ms| {
        RunError::ElementNotVisible {
            locator: locator.to_string(),
            timeout_ms,
        }
    })
}

/// One-shot existence probe. Never errors on absence; used for the
/// optional/alternate UI paths.
pub async fn exists(page: &Page, locator: &Locator) -> bool {
    let Ok(expr) = locator.to_js() else {
        return false;
    };
    let check = format!("(() => {{ const el = {expr}; return el !== null && el !== undefined; }})()");
    evaluate_bool(page, &check).await
}

async fn poll(page: &Page, check: &str, timeout: Duration) -> Result<(), u64> {
    let timeout_ms = timeout.as_millis() as u64;
    let mut elapsed = 0u64;
    loop {
        if evaluate_bool(page, check).await {
            return Ok(());
        }
        if elapsed >= timeout_ms {
            return Err(timeout_ms);
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        elapsed += POLL_INTERVAL_MS;
    }
}

async fn evaluate_bool(page: &Page, check: &str) -> bool {
    page.evaluate(check)
        .await
        .ok()
        .and_then(|r| r.into_value().ok())
        .unwrap_or(false)
}
