use anyhow::Result;
use cdp_docs_client::{config::Config, server, ApiClient, Orchestrator};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cdp_docs_client=debug,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Using search backend at {}", config.api_url);

    let orchestrator = Orchestrator::new(Arc::new(ApiClient::new(config.api_url.clone())));
    orchestrator.start(config.poll_interval).await;

    let app = server::router(orchestrator.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("CDP docs client running on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}
