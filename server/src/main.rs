mod config;
mod handlers;
mod state;
mod views;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("server=debug,common=debug,tower_http=info,axum=info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(
        "configuración: max_runs={} max_upload_bytes={}",
        config.max_runs, config.max_upload_bytes
    );

    let state = AppState::new(&config).context("no se pudieron cargar las plantillas")?;

    // router HTTP
    let app = handlers::build_router(state, config.max_upload_bytes);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("no se pudo abrir {}", config.bind_addr))?;
    info!("servidor escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
