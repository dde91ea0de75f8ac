use clap::Parser;
use std::path::PathBuf;

use guia_e2e::browser::Session;
use guia_e2e::config::{Overrides, RunConfig};
use guia_e2e::scenario;

/// guia-e2e: browser-driven CRUD scenario runner for the Guías service
#[derive(Parser)]
#[command(name = "guia-e2e", version, about)]
struct Cli {
    /// Run Chrome with a visible window (default: headless)
    #[arg(long)]
    headed: bool,

    /// Base URL of the application under test
    #[arg(long)]
    base_url: Option<String>,

    /// Identifier of the guide record the scenario works with
    #[arg(long)]
    guide_id: Option<u32>,

    /// Display name of the guide record
    #[arg(long)]
    guide_name: Option<String>,

    /// CDP websocket of a remote browser (launches Chrome locally if omitted)
    #[arg(long)]
    remote_ws: Option<String>,

    /// Directory for checkpoint screenshots
    #[arg(long)]
    evidence_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    let config = RunConfig::resolve(Overrides {
        headed: cli.headed,
        base_url: cli.base_url,
        guide_id: cli.guide_id,
        guide_name: cli.guide_name,
        remote_ws: cli.remote_ws,
        evidence_dir: cli.evidence_dir,
    })?;

    tracing::info!(
        "starting scenario for guide {} ({:?}) against {}",
        config.guide_id,
        config.guide_name,
        config.base_url
    );

    let session = Session::acquire(&config).await?;
    let outcome = scenario::run(&session, &config).await;

    // The session is released whether the scenario passed, failed, or
    // timed out mid-step.
    session.close().await;

    match outcome {
        Ok(()) => {
            tracing::info!("scenario passed");
            Ok(())
        }
        Err(err) => {
            tracing::error!("scenario failed: {err}");
            Err(err.into())
        }
    }
}
