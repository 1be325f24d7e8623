use anyhow::Context;

use libris_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    libris_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(store = config.store.kind(), "starting libris-api");

    let services = libris_api::app::services::build_services(&config.store)
        .await
        .context("failed to initialize store")?;
    let app = libris_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
