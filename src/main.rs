use anyhow::Context;
use aurax_client::{ClientConfig, InsightsCollector, RemoteClient};
use local_store::{DiagnosticLog, LocalStore};
use std::sync::Arc;
use std::time::Duration;
use sync_scheduler::{Notifier, SyncScheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "auraxsync=debug,aurax_client=debug,sync_scheduler=debug".to_string()),
        )
        .init();

    tracing::info!("Starting Auraxsync - Instagram insights sync agent");

    let data_dir = match std::env::var("AURAX_DATA_DIR") {
        Ok(dir) => dir.into(),
        Err(_) => dirs::data_dir()
            .context("No platform data directory available; set AURAX_DATA_DIR")?
            .join("auraxsync"),
    };
    let store = Arc::new(LocalStore::open(&data_dir)?);
    tracing::info!("Using local store at {}", data_dir.display());

    let environment =
        std::env::var("AURAX_ENVIRONMENT").unwrap_or_else(|_| "copy".to_string());
    let diagnostics = Arc::new(DiagnosticLog::new(store.clone(), environment.clone()));

    let config = ClientConfig {
        base_url: std::env::var("AURAX_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5003/api".to_string()),
        environment,
        request_timeout: Duration::from_secs(30),
    };
    let client = Arc::new(RemoteClient::new(config, store.clone(), diagnostics.clone())?);

    let access_token = std::env::var("AURAX_INSTAGRAM_ACCESS_TOKEN").unwrap_or_default();
    if access_token.is_empty() {
        tracing::warn!("AURAX_INSTAGRAM_ACCESS_TOKEN is not set; syncs will fail until it is");
    }
    let collector = Arc::new(InsightsCollector::new(
        client,
        diagnostics.clone(),
        access_token,
    ));

    let scheduler = SyncScheduler::new(collector, store, diagnostics, Notifier::new());
    scheduler.initialize()?;

    let status = scheduler.get_sync_status();
    if status.is_running {
        tracing::info!(
            "Daily sync armed for {} local time (next fire: {:?})",
            status.scheduled_time,
            status.next_sync_estimate
        );
    } else {
        tracing::info!("Auto sync disabled; waiting (enable it in the saved sync settings)");
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    scheduler.stop_daily_sync();

    Ok(())
}
