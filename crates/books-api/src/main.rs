//! # Book Catalog API Server
//!
//! Binary entry point for the REST API service.

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use books_api::seed::{self, AdminSeed};
use books_api::{AppState, Config, build_router};
use books_persistence::{AuditLogger, Database};

/// How long shutdown waits for queued audit records to be written
const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = books_api::VERSION,
        environment = %config.environment,
        "Starting {}",
        config.app_name
    );

    let db = Database::connect(config.database_config()).await?;

    match seed::initial_import(&db, config.retry, &config.pipeline.csv_path).await {
        Ok(Some(report)) if !report.skipped => {
            tracing::info!(inserted = report.inserted, "Initial catalog imported");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Initial catalog import failed, serving existing data"),
    }

    let (audit, audit_worker) = AuditLogger::spawn(db.clone(), config.audit_config());
    let state = AppState::new(config.clone(), db.clone(), audit);

    if let Some(password) = config.admin.password.as_deref() {
        match seed::ensure_admin(
            state.users.as_ref(),
            &config.admin,
            password,
            config.auth.password_hash_cost,
        )
        .await?
        {
            AdminSeed::Created(user) => tracing::info!(username = %user.username, "Admin seeded"),
            AdminSeed::AlreadyExists => {}
        }
    } else {
        tracing::info!("ADMIN_PASSWORD not set, skipping admin seeding");
    }

    let app = build_router(state);

    let addr = config.server_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and every AuditLogger handle in it) is gone; the worker
    // drains what is queued and exits.
    if tokio::time::timeout(AUDIT_DRAIN_TIMEOUT, audit_worker).await.is_err() {
        tracing::warn!("Audit worker did not drain in time, pending records lost");
    }
    db.close().await;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
