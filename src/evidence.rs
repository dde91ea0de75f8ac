//! Checkpoint screenshots. Strictly diagnostic: every failure here is
//! swallowed and logged, never propagated into the scenario outcome.

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotParams;
use chromiumoxide::page::Page;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Capture a named checkpoint, best-effort.
pub async fn capture(page: &Page, dir: &Path, checkpoint: &str) {
    match try_capture(page, dir, checkpoint).await {
        Ok(path) => tracing::debug!("checkpoint '{}' captured at {}", checkpoint, path.display()),
        Err(err) => tracing::warn!("checkpoint '{}' capture failed: {:#}", checkpoint, err),
    }
}

async fn try_capture(page: &Page, dir: &Path, checkpoint: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create evidence directory {}", dir.display()))?;

    let bytes = page
        .screenshot(CaptureScreenshotParams::builder().build())
        .await
        .context("failed to take screenshot")?;

    let path = dir.join(filename(checkpoint, Utc::now()));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn filename(checkpoint: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.png", at.format("%Y%m%d_%H%M%S"), checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filename_is_timestamp_prefixed() {
        let at = Utc.with_ymd_and_hms(2026, 8, 7, 14, 3, 9).unwrap();
        assert_eq!(filename("created", at), "20260807_140309_created.png");
    }
}
