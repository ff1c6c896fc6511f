use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parlor_api::config::{ServerConfig, StorageBackend};
use parlor_api::router::build_app_router;
use parlor_api::state::AppState;
use parlor_events::{AccountNotifier, EmailConfig, EmailDelivery, EventBus, EventLog};

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str =
    "parlor_api=debug,parlor_db=info,parlor_events=info,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    let log_handle = tokio::spawn(EventLog::run(event_bus.subscribe()));

    let mailer = EmailConfig::from_env().map(EmailDelivery::new);
    if mailer.is_none() {
        tracing::warn!("SMTP_HOST not set; account emails will only be logged");
    }
    let notifier = AccountNotifier::new(
        mailer,
        config.app_base_url.clone(),
        config.reset_token_ttl_mins,
    );
    let notifier_handle = tokio::spawn(notifier.run(event_bus.subscribe()));

    tracing::info!("Event services started (log, account notifier)");

    // --- Storage ---
    let state = match &config.storage {
        StorageBackend::Postgres { database_url } => {
            let pool = parlor_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            parlor_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            parlor_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            AppState::postgres(pool, config.clone(), Arc::clone(&event_bus))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            AppState::in_memory(config.clone(), Arc::clone(&event_bus))
        }
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Dropping the last sender closes the channel and ends both subscribers.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), log_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), notifier_handle).await;
    tracing::info!("Event services shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM (Unix) to begin graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
