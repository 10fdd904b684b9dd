//! Storerate API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use storerate_api::config::ServerConfig;
use storerate_api::error::AppError;
use storerate_api::state::AppState;
use storerate_api::{app, telemetry};
use storerate_core::clock::{Clock, SystemClock};
use storerate_persistence::{Argon2CredentialHasher, MIGRATOR, PgEntityStore, PgIdentityProvider};
use tracing::info;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = ServerConfig::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;

    info!("Starting storerate API server");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        MIGRATOR.run(&pool).await?;
        info!("migrations applied");
    }

    // Build application state.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app_state = AppState::new(
        Arc::new(PgEntityStore::new(pool.clone())),
        Arc::new(PgIdentityProvider::new(pool.clone(), Arc::clone(&clock))),
        Arc::new(Argon2CredentialHasher),
        clock,
        config.retry,
    );

    let router = app(app_state).layer(config.cors_layer()?);

    // Start server.
    let addr = config.socket_addr()?;
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    telemetry::shutdown(tracer_provider.as_ref());
    info!("server stopped");

    Ok(())
}
