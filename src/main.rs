use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use skydiary_core::{Clock, Config, SystemClock};
use skydiary_services::{DiaryManager, RefreshScheduler, SqliteDiaryStore};
use skydiary_weather::OpenWeatherProvider;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skydiary_core::init()?;

    let (config, _) = Config::load_validated()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store = SqliteDiaryStore::new(&config.database.path).with_context(|| {
        format!(
            "Failed to open diary database at {}",
            config.database.path.display()
        )
    })?;
    let store = Arc::new(Mutex::new(store));

    let provider = OpenWeatherProvider::new(&config.weather, Arc::clone(&clock))
        .context("Failed to build weather provider")?;

    let manager = Arc::new(
        DiaryManager::new(Arc::new(provider), store, Arc::clone(&clock))
            .with_config(&config.diary),
    );

    tracing::info!(
        "SkyDiary started (city: {}, database: {})",
        config.weather.city,
        config.database.path.display()
    );

    let token = CancellationToken::new();
    let scheduler = if config.refresh.enabled {
        let scheduler = RefreshScheduler::new(Arc::clone(&manager), &config.refresh, clock)?;
        tracing::info!("Next weather refresh at {}", scheduler.next_run());
        Some(tokio::spawn(scheduler.run(token.clone())))
    } else {
        tracing::info!("Scheduled weather refresh disabled");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");

    // Graceful shutdown
    token.cancel();
    if let Some(handle) = scheduler {
        handle.await.context("Refresh task panicked")?;
    }

    Ok(())
}
