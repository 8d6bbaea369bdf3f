//! Subtitle burn-in worker binary.
//!
//! Runs one pairing from the command line:
//! `subburn-worker <video-link> <subtitle-link>`. Status messages go to the
//! log and the finished video is copied to `SUBBURN_DELIVERY_DIR`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subburn_models::UserId;
use subburn_worker::metrics::init_metrics;
use subburn_worker::{
    welcome_text, ArtifactEvent, IngestionController, IngestionOutcome, LogNotifier,
    WorkerConfig,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Worker error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        bail!("Failed to install rustls crypto provider");
    }

    dotenvy::dotenv().ok();
    init_tracing()?;

    let links: Vec<String> = std::env::args().skip(1).collect();
    if links.len() != 2 {
        bail!("usage: subburn-worker <video-link> <subtitle-link>");
    }

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        init_metrics(addr)?;
        info!("Serving metrics on {}", addr);
    }

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("creating work dir {}", config.work_dir.display()))?;

    let delivery_dir = std::env::var("SUBBURN_DELIVERY_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./out"));
    let user_id = UserId::new(
        std::env::var("SUBBURN_CLI_USER")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
    );

    let notifier = Arc::new(LogNotifier::new(&delivery_dir));
    let controller = IngestionController::new(&config, notifier)?;

    info!("{}", welcome_text());

    let mut last = IngestionOutcome::Ignored;
    for link in links {
        last = controller.on_artifact(user_id, ArtifactEvent::link(link)).await;
        if let IngestionOutcome::Rejected(e) = &last {
            bail!("submission rejected: {}", e);
        }
    }

    match last {
        IngestionOutcome::Transcoded(outcome) if outcome.is_success() => {
            info!("Output delivered to {}", delivery_dir.display());
            Ok(())
        }
        IngestionOutcome::Transcoded(outcome) => bail!("transcode failed: {:?}", outcome),
        other => {
            warn!("Pairing incomplete: {:?}", other);
            bail!("both a video and a subtitle link are required")
        }
    }
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("subburn=info".parse()?)
        .add_directive("hyper=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}
