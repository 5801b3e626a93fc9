//! msync - Main entry point
//!
//! Synchronizes the artists of an MPD music library with a MuSpy account:
//! one pass of merge, identifier resolution, reconciliation, and parallel
//! upload/removal against the remote catalog.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use msync::ledger::ArtistLedger;
use msync::services::{MpdSource, MusicBrainzClient, MuspyClient};
use msync::SyncOrchestrator;
use msync_common::Config;

/// Command-line arguments for msync
#[derive(Parser, Debug)]
#[command(name = "msync")]
#[command(about = "Sync the artists of your MPD database with your MuSpy account")]
#[command(version)]
struct Args {
    /// Drop the artist ledger and start syncing from a fresh one
    #[arg(short, long)]
    clean: bool,

    /// Path to the configuration file
    #[arg(long, env = "MSYNC_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "msync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting msync {}", env!("CARGO_PKG_VERSION"));

    // Configuration is required; nothing runs without credentials
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let ledger_path = config.ledger_path();
    info!("Ledger: {}", ledger_path.display());

    let ledger = if args.clean {
        info!("Starting from a fresh ledger");
        let fresh = ArtistLedger::new(&ledger_path, config.ignore_set());
        fresh
            .save()
            .context("Failed to initialize a fresh ledger")?;
        fresh
    } else {
        ArtistLedger::load(&ledger_path, config.ignore_set())
    };

    let source = Arc::new(MpdSource::new(&config.mpd));
    let search =
        Arc::new(MusicBrainzClient::new().context("Failed to build the MusicBrainz client")?);
    let catalog =
        Arc::new(MuspyClient::new(&config.muspy).context("Failed to build the MuSpy client")?);

    let orchestrator = SyncOrchestrator::new(config.sync.clone(), source, search, catalog);

    // Ctrl-C stops the workers and keeps the last committed ledger state
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping workers");
            signal_cancel.cancel();
        }
    });

    let summary = orchestrator
        .run(ledger, &cancel)
        .await
        .context("Synchronization failed")?;

    info!("{}", summary);
    Ok(())
}
