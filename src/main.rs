use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ara_notification_engine::config::{LoggingConfig, Settings};
use ara_notification_engine::server::{create_app, AppState};
use ara_notification_engine::store::{create_stores, seed_defaults};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    init_tracing(&settings.logging);
    tracing::info!(
        run_mode = %settings.run_mode,
        production = settings.is_production(),
        "Configuration loaded"
    );

    // Create stores
    let stores = create_stores(&settings.database).await?;
    if settings.database.seed_defaults {
        seed_defaults(&stores, chrono::Utc::now()).await?;
    }

    // Create application state
    let state = AppState::new(settings.clone(), stores.clone())?;
    tracing::info!(store = stores.backend(), "Application state initialized");

    // Start scheduler in background
    let scheduler = state.scheduler.clone();
    if settings.scheduler.enabled {
        scheduler.start().await;
    } else {
        tracing::info!("Scheduler disabled by configuration");
    }

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler())
        .await?;

    // Drain the scheduler after the server stops accepting work
    tracing::info!("Stopping scheduler...");
    scheduler.stop().await;
    stores.close().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal_handler() {
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
}
