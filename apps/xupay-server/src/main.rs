// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use xupay_server::{
    api::router,
    auth::TokenIssuer,
    config::{LogFormat, ServerConfig},
    state::AppState,
    store::InMemoryStore,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing(LogFormat::from_env());

    let config = ServerConfig::from_env()?;

    let mut store = InMemoryStore::new(config.store.clone());
    if config.seed_demo_data {
        let ids = store.seed_demo_data()?;
        tracing::info!(accounts = ids.len(), "Seeded demo accounts");
    }

    let state = AppState::new(store, TokenIssuer::new(&config.jwt_secret, config.token_ttl));
    let app = router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "XuPay server listening (docs at /docs)");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn watch_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Shutdown signal received; draining connections");
            shutdown.cancel();
        }
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
