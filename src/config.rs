//! Run configuration, seeded from environment variables with CLI overrides.
//!
//! The resolved [`RunConfig`] is immutable for the duration of a run and is
//! passed explicitly into every component; nothing reads the environment
//! after resolution.

use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Timelike, Utc};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://springapp.local";
const DEFAULT_GUIDE_ID: u32 = 12_345;
const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;
const DEFAULT_EVIDENCE_DIR: &str = "evidence";
const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Explicit per-operation timeouts. There is no implicit wait anywhere in
/// the runner; every suspension point is bounded by one of these.
#[derive(Debug, Clone, Copy)]
pub struct OperationTimeouts {
    pub script: Duration,
    pub navigation: Duration,
    pub element_wait: Duration,
}

/// Immutable configuration for one scenario run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base URL of the application under test.
    pub base_url: String,
    /// Identifier of the guide record the scenario creates and deletes.
    pub guide_id: u32,
    /// Display name of the guide record.
    pub guide_name: String,
    /// CDP websocket of a remote browser; launches Chrome locally when unset.
    pub remote_ws: Option<String>,
    pub headless: bool,
    pub max_connect_attempts: u32,
    /// Explicit Chrome binary; discovered on the host when unset.
    pub chrome_binary: Option<PathBuf>,
    pub evidence_dir: PathBuf,
    pub timeouts: OperationTimeouts,
}

/// Explicit overrides applied on top of the environment (from the CLI).
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub headed: bool,
    pub base_url: Option<String>,
    pub guide_id: Option<u32>,
    pub guide_name: Option<String>,
    pub remote_ws: Option<String>,
    pub evidence_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(Overrides::default())
    }

    /// Resolve the configuration: CLI overrides win over environment
    /// variables, which win over defaults. Invariants (positive identifier,
    /// non-empty name) are checked here, before any session is opened.
    pub fn resolve(overrides: Overrides) -> Result<Self, ConfigError> {
        let guide_id = match overrides.guide_id {
            Some(id) => id,
            None => match env_var("GUIA_ID") {
                Some(value) if value.eq_ignore_ascii_case("random") => random_guide_id(),
                Some(value) => parse_u32("GUIA_ID", &value)?,
                None => DEFAULT_GUIDE_ID,
            },
        };
        if guide_id == 0 {
            return Err(ConfigError::NonPositive { field: "guide id" });
        }

        let guide_name = overrides
            .guide_name
            .or_else(|| env_var("GUIA_NAME"))
            .unwrap_or_else(|| format!("Marcos-{guide_id}"));
        if guide_name.trim().is_empty() {
            return Err(ConfigError::Empty { field: "guide name" });
        }

        let headless = if overrides.headed {
            false
        } else {
            match env_var("GUIA_HEADLESS") {
                Some(value) => parse_bool("GUIA_HEADLESS", &value)?,
                None => true,
            }
        };

        let max_connect_attempts = match env_var("GUIA_CONNECT_ATTEMPTS") {
            Some(value) => parse_u32("GUIA_CONNECT_ATTEMPTS", &value)?.max(1),
            None => DEFAULT_CONNECT_ATTEMPTS,
        };

        let timeouts = OperationTimeouts {
            script: duration_from_env("GUIA_SCRIPT_TIMEOUT_MS", DEFAULT_SCRIPT_TIMEOUT_MS)?,
            navigation: duration_from_env("GUIA_NAV_TIMEOUT_MS", DEFAULT_NAV_TIMEOUT_MS)?,
            element_wait: duration_from_env("GUIA_WAIT_TIMEOUT_MS", DEFAULT_WAIT_TIMEOUT_MS)?,
        };

        Ok(RunConfig {
            base_url: overrides
                .base_url
                .or_else(|| env_var("GUIA_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            guide_id,
            guide_name,
            remote_ws: overrides.remote_ws.or_else(|| env_var("GUIA_REMOTE_WS")),
            headless,
            max_connect_attempts,
            chrome_binary: env_var("GUIA_CHROME").map(PathBuf::from),
            evidence_dir: overrides
                .evidence_dir
                .or_else(|| env_var("GUIA_EVIDENCE_DIR").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EVIDENCE_DIR)),
            timeouts,
        })
    }

    /// Absolute URL for an API path under the configured base URL.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Errors that can arise while resolving a [`RunConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid number '{value}' for {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid boolean '{value}' for {field}")]
    InvalidBool { field: &'static str, value: String },
    #[error("{field} must be a positive integer")]
    NonPositive { field: &'static str },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|source| ConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| ConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

fn duration_from_env(field: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms = match env_var(field) {
        Some(value) => parse_u64(field, &value)?,
        None => default_ms,
    };
    Ok(Duration::from_millis(ms))
}

/// Pseudo-random identifier in the 10000..99999 range for `GUIA_ID=random`.
fn random_guide_id() -> u32 {
    10_000 + Utc::now().nanosecond() % 90_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(vars: &[(&str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(key, value)| {
                    let original = env::var(key).ok();
                    match value {
                        Some(v) => env::set_var(key, v),
                        None => env::remove_var(key),
                    };
                    ((*key).to_string(), original)
                })
                .collect();
            EnvGuard { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(&key, v),
                    None => env::remove_var(&key),
                }
            }
        }
    }

    fn with_env<F, T>(vars: &[(&str, Option<&str>)], f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let lock = env_lock().lock().expect("env mutex poisoned");
        let guard = EnvGuard::new(vars);
        let result = f();
        drop(guard);
        drop(lock);
        result
    }

    const ALL_VARS: &[(&str, Option<&str>)] = &[
        ("GUIA_BASE_URL", None),
        ("GUIA_ID", None),
        ("GUIA_NAME", None),
        ("GUIA_REMOTE_WS", None),
        ("GUIA_HEADLESS", None),
        ("GUIA_CONNECT_ATTEMPTS", None),
        ("GUIA_CHROME", None),
        ("GUIA_EVIDENCE_DIR", None),
        ("GUIA_SCRIPT_TIMEOUT_MS", None),
        ("GUIA_NAV_TIMEOUT_MS", None),
        ("GUIA_WAIT_TIMEOUT_MS", None),
    ];

    #[test]
    fn defaults_when_environment_is_empty() {
        with_env(ALL_VARS, || {
            let config = RunConfig::from_env().expect("config");
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
            assert_eq!(config.guide_id, 12_345);
            assert_eq!(config.guide_name, "Marcos-12345");
            assert!(config.remote_ws.is_none());
            assert!(config.headless);
            assert_eq!(config.max_connect_attempts, 3);
            assert_eq!(config.evidence_dir, PathBuf::from("evidence"));
            assert_eq!(config.timeouts.script, Duration::from_millis(30_000));
            assert_eq!(config.timeouts.element_wait, Duration::from_millis(10_000));
        });
    }

    #[test]
    fn environment_values_override_defaults() {
        let vars = [
            ("GUIA_BASE_URL", Some("http://localhost:8080/")),
            ("GUIA_ID", Some("777")),
            ("GUIA_NAME", Some("Lucia")),
            ("GUIA_REMOTE_WS", Some("ws://127.0.0.1:9222/devtools")),
            ("GUIA_HEADLESS", Some("false")),
            ("GUIA_CONNECT_ATTEMPTS", Some("5")),
            ("GUIA_WAIT_TIMEOUT_MS", Some("2500")),
        ];
        with_env(&vars, || {
            let config = RunConfig::from_env().expect("config");
            assert_eq!(config.base_url, "http://localhost:8080/");
            assert_eq!(config.guide_id, 777);
            assert_eq!(config.guide_name, "Lucia");
            assert_eq!(
                config.remote_ws.as_deref(),
                Some("ws://127.0.0.1:9222/devtools")
            );
            assert!(!config.headless);
            assert_eq!(config.max_connect_attempts, 5);
            assert_eq!(config.timeouts.element_wait, Duration::from_millis(2_500));
        });
    }

    #[test]
    fn cli_overrides_win_over_environment() {
        let vars = [("GUIA_BASE_URL", Some("http://env")), ("GUIA_ID", Some("1"))];
        with_env(&vars, || {
            let config = RunConfig::resolve(Overrides {
                headed: true,
                base_url: Some("http://cli".into()),
                guide_id: Some(42),
                ..Overrides::default()
            })
            .expect("config");
            assert_eq!(config.base_url, "http://cli");
            assert_eq!(config.guide_id, 42);
            assert_eq!(config.guide_name, "Marcos-42");
            assert!(!config.headless);
        });
    }

    #[test]
    fn zero_identifier_is_rejected() {
        with_env(ALL_VARS, || {
            let err = RunConfig::resolve(Overrides {
                guide_id: Some(0),
                ..Overrides::default()
            })
            .expect_err("zero id must be rejected");
            assert!(matches!(err, ConfigError::NonPositive { .. }));
        });
    }

    #[test]
    fn blank_name_is_rejected() {
        with_env(ALL_VARS, || {
            let err = RunConfig::resolve(Overrides {
                guide_name: Some("   ".into()),
                ..Overrides::default()
            })
            .expect_err("blank name must be rejected");
            assert!(matches!(err, ConfigError::Empty { .. }));
        });
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let vars = [("GUIA_ID", Some("twelve"))];
        with_env(&vars, || {
            let err = RunConfig::from_env().expect_err("malformed id");
            assert!(err.to_string().contains("GUIA_ID"));
        });
    }

    #[test]
    fn random_identifier_stays_in_range() {
        with_env(&[("GUIA_ID", Some("random"))], || {
            let config = RunConfig::from_env().expect("config");
            assert!((10_000..100_000).contains(&config.guide_id));
        });
    }

    #[test]
    fn api_url_joins_without_double_slash() {
        with_env(&[("GUIA_BASE_URL", Some("http://localhost:8080/"))], || {
            let config = RunConfig::from_env().expect("config");
            assert_eq!(
                config.api_url("/api/guides/getById/1"),
                "http://localhost:8080/api/guides/getById/1"
            );
        });
    }
}
