//! Feedplay video player (feedplay-vp) - scenario runner
//!
//! Replays a scripted feed scroll against the playback coordinator running
//! on the in-memory host. Every coordinator event is printed to stdout as a
//! JSON line, followed by a pretty-printed run summary. Logs go to stderr.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use feedplay_vp::config::Config;
use feedplay_vp::scenario::{Scenario, ScenarioRunner};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for feedplay-vp
#[derive(Parser, Debug)]
#[command(name = "feedplay-vp")]
#[command(about = "Replay a scripted feed scroll against the playback coordinator")]
#[command(version)]
struct Args {
    /// Scenario script (TOML, [[step]] entries)
    #[arg(short, long, env = "FEEDPLAY_SCRIPT")]
    script: PathBuf,

    /// Configuration file (overrides FEEDPLAY_CONFIG and the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (defaults to the config file's level)
    #[arg(long, env = "FEEDPLAY_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("feedplay_vp={level},feedplay_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let scenario = Scenario::load(&args.script)
        .with_context(|| format!("Failed to load scenario {:?}", args.script))?;

    let mut runner = ScenarioRunner::new(config.coordinator);
    info!("Coordinator ready, replaying {} step(s)", scenario.steps.len());

    let mut events = runner.coordinator().events();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event.to_json() {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Event printer lagged, {} skipped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let summary = tokio::select! {
        result = runner.run(&scenario) => Some(result.context("Scenario failed")?),
        _ = shutdown_signal() => None,
    };

    runner.coordinator().destroy().await;
    drop(runner);
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        warn!("Event printer did not finish");
    }

    match summary {
        Some(summary) => {
            let report = serde_json::to_string_pretty(&summary).context("Failed to render summary")?;
            println!("{}", report);
        }
        None => info!("Interrupted before the scenario finished"),
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
