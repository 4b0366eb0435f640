use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use edunotify_sim::config::Settings;
use edunotify_sim::delivery::{create_email_provider, DeliveryWorker, WorkerConfig};
use edunotify_sim::queue::create_delivery_queue;
use edunotify_sim::server::{create_app, AppState};
use edunotify_sim::storage::create_repositories;
use edunotify_sim::tasks::MaintenanceTask;
use edunotify_sim::telemetry::init_telemetry;
use edunotify_sim::template::seed_templates;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new().context("Failed to load configuration")?;
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    let (repositories, postgres_pool) = create_repositories(&settings.database)
        .await
        .context("Failed to initialize storage")?;

    if settings.seed.enabled {
        match seed_templates(repositories.templates.as_ref(), &settings.seed.owner_id).await {
            Ok(inserted) => tracing::info!(inserted = inserted, "Sample templates seeded"),
            Err(e) => tracing::warn!(error = %e, "Failed to seed sample templates"),
        }
    }

    let queue = create_delivery_queue(&settings.queue, &settings.redis).await;
    let provider = create_email_provider(&settings.email)?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let worker = DeliveryWorker::new(
        queue.clone(),
        repositories.send_records.clone(),
        provider.clone(),
        WorkerConfig::from_queue(&settings.queue),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_tx.subscribe()));

    let state = AppState::new(
        settings.clone(),
        repositories,
        queue.clone(),
        provider.as_ref(),
        postgres_pool.clone(),
    );
    tracing::info!("Application state initialized");

    let maintenance = MaintenanceTask::new(
        state.rate_limiter.clone(),
        queue,
        shutdown_tx.subscribe(),
    );
    let maintenance_handle = tokio::spawn(maintenance.run());

    let app = create_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        address = %addr,
        api_prefix = %settings.server.api_prefix,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = tokio::join!(worker_handle, maintenance_handle);

    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    let _ = shutdown_tx.send(());
}
