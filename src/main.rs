// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use chrono::Utc;
use healthclub_server::{
    api::router,
    config::{ServerConfig, LOG_FORMAT_ENV},
    error::set_production_mode,
    services::admin::ensure_superadmin,
    state::AppState,
    storage::{DocumentStorage, StoragePaths},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn watch_signals(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}

async fn run() -> Result<(), BoxError> {
    let config = ServerConfig::from_env();
    set_production_mode(config.is_production());

    if config.uses_dev_secret_in_production() {
        return Err("JWT_SECRET must be set in production".into());
    }

    let mut storage = DocumentStorage::new(StoragePaths::new(&config.data_dir));
    storage.initialize()?;
    tracing::info!(data_dir = %config.data_dir.display(), "Document store ready");

    let addr = config.bind_addr()?;
    let seed_email = config.seed_superadmin_email.clone();
    let state = AppState::new(storage, config)?;

    if let Some(email) = seed_email {
        match ensure_superadmin(&state, &email, Utc::now()).await {
            Ok(true) => tracing::info!(email = %email, "Superadmin seed applied"),
            Ok(false) => tracing::warn!(email = %email, "Superadmin seed skipped: no account with that email"),
            Err(e) => tracing::error!(error = %e, "Superadmin seed failed"),
        }
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Health club server listening (docs at /docs)");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}
