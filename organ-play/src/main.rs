//! Organ Player (organ-play) - Main entry point
//!
//! Loads a score sheet, performs it on the reference engine and reports the
//! elapsed time. Ctrl+C silences the organ immediately.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use organ_common::ConfigResolver;
use organ_play::cli::Args;
use organ_play::playback::{ClockEngine, Coordinator, LogSink, PlaybackEngine, Score, Synchronizer};
use organ_play::{OperatorInterrupt, TimingManager};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status after an operator interrupt (128 + SIGINT)
const INTERRUPTED_EXIT_CODE: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = ConfigResolver::new("organ-play")
        .load(args.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting organ-play v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("ORGAN_PLAY_COMMIT"),
        env!("ORGAN_PLAY_BUILT_AT")
    );

    let settings = config.playback;
    let options = args.performance_options(&settings);
    let score = Score::load(&args.score, &options)
        .with_context(|| format!("Failed to load score {}", args.score.display()))?;

    let engine: Arc<dyn PlaybackEngine> = Arc::new(
        ClockEngine::new(
            score.timeline,
            score.info.ticks_per_quarter,
            Duration::from_millis(settings.heartbeat_interval_ms),
            Arc::new(LogSink),
        )
        .context("Failed to start playback engine")?,
    );
    let synchronizer = Arc::new(Synchronizer::new());
    let timing = Arc::new(TimingManager::new());

    let coordinator = Coordinator::new(
        Arc::clone(&engine),
        Arc::clone(&synchronizer),
        score.info,
        &settings,
    )
    .context("Invalid score or settings")?;
    coordinator.set_display_warnings(args.display_warnings(&settings));
    coordinator.initialize();
    coordinator.display_playback_info();

    let interrupt = OperatorInterrupt::new(engine, synchronizer, Arc::clone(&timing));

    timing.start_timer();
    let playback_timing = Arc::clone(&timing);
    let mut playback = tokio::task::spawn_blocking(move || {
        let result = coordinator.execute_playback();
        playback_timing.end_timer();
        result
    });

    tokio::select! {
        joined = &mut playback => {
            joined
                .context("Playback task panicked")?
                .context("Playback failed")?;
            timing.display_elapsed();
            Ok(ExitCode::SUCCESS)
        }
        _ = shutdown_signal() => {
            info!("Received Ctrl+C, silencing organ");
            interrupt.trigger();
            // The blocking playback thread cannot be cancelled; leave without joining it
            std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
        }
    }
}

/// Resolves on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
