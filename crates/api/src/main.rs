use anyhow::Context;

use microfin_intelligence::IntelligenceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    microfin_observability::init();

    let config = IntelligenceConfig::from_env().context("invalid MICROFIN_* configuration")?;
    let intelligence = microfin_api::app::services::build_intelligence(config).await?;
    let app = microfin_api::app::build_app(intelligence);

    let addr = std::env::var("MICROFIN_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
