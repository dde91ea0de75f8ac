use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::Handler;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tempfile::TempDir;

use super::launcher;
use crate::config::{OperationTimeouts, RunConfig};
use crate::error::RunError;
use crate::retry;

/// A live handle to one controllable browser instance. Exactly one exists
/// per run; the scenario owns it and releases it at run end regardless of
/// outcome.
pub struct Session {
    browser: Browser,
    _handler_task: tokio::task::JoinHandle<()>,
    page: Page,
    // Keeps the per-session profile directory alive until release.
    _user_data_dir: Option<TempDir>,
    pub timeouts: OperationTimeouts,
}

impl Session {
    /// Acquire a browser session, retrying with linearly increasing backoff.
    /// Exhausting the configured attempts surfaces the last underlying error
    /// as [`RunError::SessionUnavailable`].
    pub async fn acquire(config: &RunConfig) -> Result<Self, RunError> {
        let attempts = config.max_connect_attempts;
        let (browser, handler, user_data_dir) = retry::with_retry(
            |attempt| {
                tracing::info!("acquiring browser session (attempt {}/{})", attempt, attempts);
                connect(config)
            },
            attempts,
            retry::linear_backoff,
        )
        .await
        .map_err(|source| RunError::SessionUnavailable { attempts, source })?;

        let handler_task = tokio::spawn(drain_events(handler));

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create initial page")?;

        tracing::info!(
            "browser session established (headless: {}, script timeout: {:?}, page-load timeout: {:?}, element wait: {:?})",
            config.headless,
            config.timeouts.script,
            config.timeouts.navigation,
            config.timeouts.element_wait
        );

        Ok(Self {
            browser,
            _handler_task: handler_task,
            page,
            _user_data_dir: user_data_dir,
            timeouts: config.timeouts,
        })
    }

    /// The single page this session drives.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate the page, bounded by the configured page-load timeout.
    pub async fn navigate(&self, url: &str) -> Result<(), RunError> {
        tracing::info!("navigating to: {}", url);
        tokio::time::timeout(self.timeouts.navigation, self.page.goto(url))
            .await
            .map_err(|_| anyhow!("page-load timeout after {:?} for {}", self.timeouts.navigation, url))?
            .with_context(|| format!("failed to navigate to {}", url))?;

        // chromiumoxide's goto() waits for the load event; this settle covers
        // post-load JS rendering.
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(())
    }

    /// Release the session. Dropping the browser kills a locally launched
    /// Chrome and disconnects a remote attach; the event task ends with it.
    pub async fn close(self) {
        tracing::info!("releasing browser session");
        drop(self.browser);
    }
}

async fn drain_events(mut handler: Handler) {
    while let Some(_event) = handler.next().await {
        // Process browser events
    }
}

async fn connect(config: &RunConfig) -> Result<(Browser, Handler, Option<TempDir>)> {
    if let Some(ws) = &config.remote_ws {
        tracing::info!("attaching to remote browser at {}", ws);
        let (browser, handler) = Browser::connect(ws.clone())
            .await
            .with_context(|| format!("failed to attach to {}", ws))?;
        return Ok((browser, handler, None));
    }

    let binary = match &config.chrome_binary {
        Some(path) => path.clone(),
        None => launcher::find_chrome_binary()?,
    };
    let user_data_dir = tempfile::tempdir().context("failed to create user data dir")?;

    let mut builder = BrowserConfig::builder()
        .chrome_executable(&binary)
        .user_data_dir(user_data_dir.path())
        .window_size(1280, 720);
    for arg in launcher::chrome_args(config.headless) {
        builder = builder.arg(arg);
    }
    let browser_config = builder.build().map_err(|e| anyhow!("{}", e))?;

    let (browser, handler) = Browser::launch(browser_config)
        .await
        .context("failed to launch Chrome")?;
    Ok((browser, handler, Some(user_data_dir)))
}
