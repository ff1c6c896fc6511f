use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parlor_db::memory::MemoryMatchStore;
use parlor_db::pg::PgMatchStore;
use parlor_db::stores::MatchStore;
use parlor_events::{EventBus, EventLog};
use parlor_match::config::{MatchServiceConfig, MatchStoreBackend};
use parlor_match::router::build_match_router;
use parlor_match::state::MatchState;

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "parlor_match=debug,parlor_events=info,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MatchServiceConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded match service configuration");

    let store: Arc<dyn MatchStore> = match &config.store {
        MatchStoreBackend::Memory => {
            tracing::warn!("Using in-memory match store; matches are lost on restart");
            Arc::new(MemoryMatchStore::new())
        }
        MatchStoreBackend::Postgres { database_url } => {
            let pool = parlor_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            parlor_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");
            Arc::new(PgMatchStore::new(pool))
        }
    };

    let event_bus = Arc::new(EventBus::default());
    let log_handle = tokio::spawn(EventLog::run(event_bus.subscribe()));

    let app = build_match_router(
        MatchState::new(store, Arc::clone(&event_bus)),
        config.request_timeout_secs,
    );

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting match service");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl-C handler");
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");

    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), log_handle).await;
    tracing::info!("Match service stopped");
}
