//! API server entry point.

use std::sync::Arc;

use api::AppState;
use api::config::Config;
use inventory::{PostgresStockLedger, StockLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{OrderRepository, PostgresOrderRepository};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<L, R>(config: &Config, state: Arc<AppState<L, R>>, metrics_handle: PrometheusHandle)
where
    L: StockLedger + 'static,
    R: OrderRepository + 'static,
{
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    api::describe_metrics();

    // 3. Pick backends and serve
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let ledger = PostgresStockLedger::new(pool.clone());
            ledger
                .run_migrations()
                .await
                .expect("failed to run migrations");
            let repository = PostgresOrderRepository::new(pool);

            tracing::info!("using PostgreSQL backends");
            serve(&config, api::create_state(ledger, repository, &config), metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory backends with demo catalog");
            serve(&config, api::create_in_memory_state(&config), metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
