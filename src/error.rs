use thiserror::Error;

use crate::config::ConfigError;

/// Failure taxonomy for a scenario run. Every step-level error propagates to
/// the top of the run, which logs it and exits non-zero.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("browser session unavailable after {attempts} attempts: {source}")]
    SessionUnavailable {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("element not found within {timeout_ms}ms: {locator}")]
    ElementNotFound { locator: String, timeout_ms: u64 },

    #[error("element not visible within {timeout_ms}ms: {locator}")]
    ElementNotVisible { locator: String, timeout_ms: u64 },

    #[error("{context}: unexpected status {status} (body: {body})")]
    UnexpectedApiStatus {
        context: &'static str,
        status: u16,
        body: String,
    },

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Browser(#[from] anyhow::Error),
}
