mod config;
mod feed;
mod handlers;
mod invoker;
mod job;
mod registry;
mod schedule;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::MasterConfig;
use crate::invoker::HttpInvoker;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("master=debug,tower_http=info")),
        )
        .init();

    let config = MasterConfig::from_env();
    info!("configuración: {:?}", config);

    let invoker = Arc::new(HttpInvoker::new(config.rpc_timeout)?);
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, invoker);

    // router HTTP
    let app = handlers::build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", bind_addr))?;
    info!("master escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
