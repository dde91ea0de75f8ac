use anyhow::Context;
use chromiumoxide::page::Page;

use super::locate::Locator;
use crate::error::RunError;

/// Trimmed text content of the located element.
pub async fn read_text(page: &Page, locator: &Locator) -> Result<String, RunError> {
    let js = format!(
        r#"(() => {{
            const el = {expr};
            if (!el) throw new Error('element not found: ' + {name});
            return (el.textContent || '').trim();
        }})()"#,
        expr = locator.to_js()?,
        name = serde_json::to_string(&locator.to_string()).unwrap_or_default()
    );

    let text: String = page
        .evaluate(js.as_str())
        .await
        .with_context(|| format!("failed to read text of {}", locator))?
        .into_value()
        .context("failed to parse text result")?;

    Ok(text)
}
