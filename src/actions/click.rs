use anyhow::Context;
use chromiumoxide::page::Page;
use std::time::Duration;

use super::locate::Locator;
use super::wait;
use crate::error::RunError;

/// Click the located element. Waits for presence, then visibility, scrolls
/// the element into view and dispatches a full mouse event sequence; falls
/// back to a programmatic click when the element is obscured.
pub async fn click(page: &Page, locator: &Locator, timeout: Duration) -> Result<(), RunError> {
    wait::wait_for(page, locator, timeout).await?;
    wait::wait_visible(page, locator, timeout).await?;

    let js = format!(
        r#"(() => {{
            const el = {expr};
            if (!el) throw new Error('element vanished before click: ' + {name});
            el.scrollIntoView({{ block: 'center', inline: 'center', behavior: 'instant' }});
            const rect = el.getBoundingClientRect();
            const x = rect.left + rect.width / 2;
            const y = rect.top + rect.height / 2;
            const top = document.elementFromPoint(x, y);
            const unobscured = top && (el === top || el.contains(top) || top.contains(el));
            if (unobscured) {{
                const opts = {{ bubbles: true, cancelable: true, clientX: x, clientY: y, button: 0 }};
                el.dispatchEvent(new MouseEvent('mousemove', opts));
                el.dispatchEvent(new MouseEvent('mousedown', opts));
                el.dispatchEvent(new MouseEvent('mouseup', opts));
                el.dispatchEvent(new MouseEvent('click', opts));
                return 'mouse_event';
            }}
            el.click();
            return 'js_click';
        }})()"#,
        expr = locator.to_js()?,
        name = serde_json::to_string(&locator.to_string()).unwrap_or_default()
    );

    let method: String = page
        .evaluate(js.as_str())
        .await
        .with_context(|| format!("failed to click {}", locator))?
        .into_value()
        .context("failed to parse click result")?;

    tracing::debug!("clicked {} via {}", locator, method);

    // Let any click handler settle before the next step observes the DOM.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
