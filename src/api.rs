//! HTTP bridge: issues API requests from inside the browser context, so
//! cookies and any state established by page navigation apply.

use anyhow::{anyhow, Context, Result};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use serde::Deserialize;
use std::time::Duration;

use crate::error::RunError;

/// Result of one bridged request. HTTP-level errors (4xx/5xx) are normal
/// results; network-level failures come back as status 0 with `error` set,
/// so callers branch uniformly on the status.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Accept only the expected statuses, converting anything else into
    /// [`RunError::UnexpectedApiStatus`] with the body kept for diagnosis.
    pub fn ensure(self, context: &'static str, expected: &[u16]) -> Result<ApiResponse, RunError> {
        if expected.contains(&self.status) {
            Ok(self)
        } else {
            let body = match self.error {
                Some(error) => error,
                None => self.body,
            };
            Err(RunError::UnexpectedApiStatus {
                context,
                status: self.status,
                body,
            })
        }
    }
}

/// Execute an HTTP request from within the active page, blocking until the
/// fetch settles or the script-execution timeout elapses.
pub async fn call_api(
    page: &Page,
    script_timeout: Duration,
    method: &str,
    url: &str,
    body: Option<&serde_json::Value>,
) -> Result<ApiResponse, RunError> {
    let js = build_fetch_script(method, url, body)?;
    let params = EvaluateParams::builder()
        .expression(js)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| anyhow!("{}", e))?;

    let evaluation = tokio::time::timeout(script_timeout, page.evaluate(params))
        .await
        .map_err(|_| {
            anyhow!(
                "script-execution timeout after {:?} for {} {}",
                script_timeout,
                method,
                url
            )
        })?
        .with_context(|| format!("failed to execute {} {} in page context", method, url))?;

    let response: ApiResponse = evaluation
        .into_value()
        .context("failed to parse fetch result")?;

    tracing::debug!("{} {} -> {}", method, url, response.status);
    Ok(response)
}

fn build_fetch_script(method: &str, url: &str, body: Option<&serde_json::Value>) -> Result<String> {
    let payload = match body {
        Some(value) => serde_json::to_string(value)?,
        None => "null".to_string(),
    };
    Ok(format!(
        r#"(async () => {{
            const payload = {payload};
            try {{
                const res = await fetch({url}, {{
                    method: {method},
                    headers: {{ 'Content-Type': 'application/json' }},
                    body: payload === null ? undefined : JSON.stringify(payload)
                }});
                const text = await res.text();
                return {{ status: res.status, body: text }};
            }} catch (err) {{
                return {{ status: 0, body: '', error: String(err) }};
            }}
        }})()"#,
        payload = payload,
        url = serde_json::to_string(url)?,
        method = serde_json::to_string(method)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fetch_script_embeds_method_url_and_body() {
        let body = json!({ "id": 12345, "nombre": "Marcos-12345" });
        let js = build_fetch_script("POST", "http://app/api/guides/create", Some(&body)).unwrap();
        assert!(js.contains(r#""POST""#));
        assert!(js.contains(r#""http://app/api/guides/create""#));
        assert!(js.contains(r#""nombre":"Marcos-12345""#));
    }

    #[test]
    fn fetch_script_omits_body_when_absent() {
        let js = build_fetch_script("DELETE", "http://app/api/guides/delete/1", None).unwrap();
        assert!(js.contains("const payload = null;"));
    }

    #[test]
    fn ensure_passes_expected_statuses_through() {
        let res = ApiResponse {
            status: 404,
            body: "not here".into(),
            error: None,
        };
        let res = res.ensure("pre-clean delete", &[204, 404]).unwrap();
        assert_eq!(res.status, 404);
    }

    #[test]
    fn ensure_rejects_unexpected_statuses_with_body() {
        let res = ApiResponse {
            status: 500,
            body: "boom".into(),
            error: None,
        };
        let err = res.ensure("create guide", &[201, 409]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("boom"));
        assert!(msg.contains("create guide"));
    }

    #[test]
    fn ensure_prefers_network_error_text_over_empty_body() {
        let res = ApiResponse {
            status: 0,
            body: String::new(),
            error: Some("TypeError: Failed to fetch".into()),
        };
        let err = res.ensure("fetch guide", &[200]).unwrap_err();
        assert!(err.to_string().contains("Failed to fetch"));
    }

    #[test]
    fn network_failure_shape_deserializes() {
        let res: ApiResponse =
            serde_json::from_str(r#"{"status":0,"body":"","error":"refused"}"#).unwrap();
        assert_eq!(res.status, 0);
        assert_eq!(res.error.as_deref(), Some("refused"));
    }
}
