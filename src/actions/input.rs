use anyhow::Context;
use chromiumoxide::page::Page;
use std::time::Duration;

use super::locate::Locator;
use super::wait;
use crate::error::RunError;

/// Clear the located field and set `text`, assigning through the native
/// value setter and dispatching synthetic `input` and `change` events so
/// framework-bound UI state observes the update.
pub async fn fill(
    page: &Page,
    locator: &Locator,
    text: &str,
    timeout: Duration,
) -> Result<(), RunError> {
    wait::wait_for(page, locator, timeout).await?;
    wait::wait_visible(page, locator, timeout).await?;

    let js = format!(
        r#"(() => {{
            const el = {expr};
            if (!el) throw new Error('element vanished before input: ' + {name});
            el.scrollIntoView({{ block: 'center', behavior: 'instant' }});
            el.focus();
            const value = {value};
            const setter = Object.getOwnPropertyDescriptor(
                window.HTMLInputElement.prototype, 'value'
            )?.set || Object.getOwnPropertyDescriptor(
                window.HTMLTextAreaElement.prototype, 'value'
            )?.set;
            if (setter && (el.tagName === 'INPUT' || el.tagName === 'TEXTAREA')) {{
                setter.call(el, value);
            }} else {{
                el.value = value;
            }}
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()"#,
        expr = locator.to_js()?,
        name = serde_json::to_string(&locator.to_string()).unwrap_or_default(),
        value = serde_json::to_string(text).unwrap_or_default()
    );

    page.evaluate(js.as_str())
        .await
        .with_context(|| format!("failed to fill {}", locator))?;

    tracing::debug!("filled {} with {:?}", locator, text);
    Ok(())
}
