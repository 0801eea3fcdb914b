use anyhow::Result;
use naiad::config::Config;
use naiad::coordinator::UsageCoordinator;
use naiad::portal::PortalClient;
use naiad::scheduler::Scheduler;
use naiad::store::JsonStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    naiad::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!("Naiad WaterSmart bridge {} starting up", env!("APP_VERSION"));

    let store = Arc::new(
        JsonStore::new(&config.store.path)
            .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?,
    );
    let portal = PortalClient::new(&config.portal)
        .map_err(|e| anyhow::anyhow!("Failed to create portal client: {}", e))?;
    let coordinator = UsageCoordinator::new(portal, store.clone(), store.clone(), &config)
        .map_err(|e| anyhow::anyhow!("Failed to create coordinator: {}", e))?;
    let coordinator = Arc::new(Mutex::new(coordinator));

    let (scheduler, handle) = Scheduler::new(
        Duration::from_secs(config.update.interval_hours * 3600),
        Duration::from_millis(config.update.refresh_cooldown_ms),
    );

    let cycle_coordinator = coordinator.clone();
    let scheduler_task = scheduler.run(move || {
        let coordinator = cycle_coordinator.clone();
        async move {
            match coordinator.lock().await.run_cycle().await {
                Ok(results) => {
                    for (account, outcome) in results {
                        if outcome.streams.values().any(|s| s.reauth_required) {
                            error!("Account {} needs re-authentication", account);
                        }
                    }
                }
                Err(e) => error!("Update cycle failed: {}", e),
            }
        }
    });

    tokio::select! {
        _ = scheduler_task => {
            info!("Scheduler stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            handle.shutdown();
        }
    }

    naiad::logging::shutdown();
    Ok(())
}
