use std::sync::Arc;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use floppy_duck_core::config::GameConfig;
use floppy_duck_core::game::session::{MatchOutcome, SessionSummary};
use floppy_duck_core::metrics::Metrics;
use floppy_duck_core::runner::{self, Autopilot};
use floppy_duck_core::services::achievements::LogSink;
use floppy_duck_core::services::sound::SilentSink;
use floppy_duck_core::services::stats::{JsonStatsStore, MemoryStatsStore, StatsStore};
use floppy_duck_core::services::theme::ClockTheme;
use floppy_duck_core::services::Services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Floppy Duck v{}", env!("CARGO_PKG_VERSION"));

    let config = GameConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {}x{} field at {} Hz, difficulty={:?}, adaptive={}, rotation={:?}",
        config.field_width,
        config.field_height,
        config.tick_rate,
        config.difficulty,
        config.adaptive_difficulty,
        config.rotation
    );

    let metrics = Arc::new(Metrics::new());
    let services = Services::new(
        open_stats(&config),
        Box::new(LogSink),
        Box::new(SilentSink),
        Box::new(ClockTheme),
    );

    let demo = run_demo(config, services, metrics.clone());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = demo => result?,
        _ = shutdown => info!("Stopping early..."),
    }

    metrics.log_summary();
    debug!("Final metrics:\n{}", metrics.to_json());
    Ok(())
}

async fn run_demo(config: GameConfig, services: Services, metrics: Arc<Metrics>) -> anyhow::Result<()> {
    let sessions = config.demo_sessions;
    let solo = runner::run_solo(config.clone(), services, metrics.clone(), sessions, Autopilot::default()).await;
    if let Some(best) = solo.iter().map(|s| s.score).max() {
        info!("Best solo score this run: {}", best);
    }

    // Uneven pilots so the match has a winner
    let pilots = [Autopilot::default(), Autopilot::new(900)];
    let [a, b] = runner::run_head_to_head(config.clone(), metrics.clone(), pilots).await?;
    log_match("Peer A", a.as_ref());
    log_match("Peer B", b.as_ref());

    #[cfg(feature = "lobby")]
    let winner = runner::run_tournament(config, metrics, 4).await?;
    #[cfg(feature = "lobby")]
    info!("Tournament winner: {:?}", winner);

    Ok(())
}

fn open_stats(config: &GameConfig) -> Box<dyn StatsStore> {
    if let Some(path) = &config.stats_path {
        return Box::new(JsonStatsStore::open(path.clone()));
    }
    match JsonStatsStore::open_default() {
        Ok(store) => {
            info!("Stats file: {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            warn!("No data directory ({}), stats kept in memory", e);
            Box::new(MemoryStatsStore::new())
        }
    }
}

fn log_match(label: &str, summary: Option<&SessionSummary>) {
    let Some(summary) = summary else {
        warn!("{}: no result", label);
        return;
    };
    let verdict = match summary.outcome {
        MatchOutcome::Won => "won",
        MatchOutcome::Lost => "lost",
        MatchOutcome::Draw => "drew",
        MatchOutcome::Solo => "played solo",
    };
    info!(
        "{} {} ({} vs {})",
        label,
        verdict,
        summary.score,
        summary.remote_score.unwrap_or_default()
    );
}
