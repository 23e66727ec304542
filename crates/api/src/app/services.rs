use std::sync::Arc;

use microfin_infra::InMemoryInventorySource;
use microfin_intelligence::{IntelligenceConfig, InventoryIntelligence, InventorySource};

/// Shared, type-erased intelligence facade handed to every handler.
pub type Intelligence = InventoryIntelligence<dyn InventorySource>;

/// Wires the collaborator selected by the environment.
///
/// With `DATABASE_URL` set (and the `postgres` feature) the Postgres source is
/// used; otherwise an empty in-memory source (dev only).
pub async fn build_intelligence(config: IntelligenceConfig) -> anyhow::Result<Arc<Intelligence>> {
    let source = build_source().await?;
    Ok(Arc::new(InventoryIntelligence::new(source, config)))
}

#[cfg(feature = "postgres")]
async fn build_source() -> anyhow::Result<Arc<dyn InventorySource>> {
    use anyhow::Context;

    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::PgPool::connect(&url)
                .await
                .context("failed to connect to Postgres")?;
            let source = microfin_infra::PostgresInventorySource::new(pool)?;
            tracing::info!("serving inventory from Postgres");
            Ok(Arc::new(source))
        }
        Err(_) => Ok(in_memory()),
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_source() -> anyhow::Result<Arc<dyn InventorySource>> {
    if std::env::var("DATABASE_URL").is_ok() {
        tracing::warn!("DATABASE_URL is set but this build lacks the `postgres` feature");
    }
    Ok(in_memory())
}

fn in_memory() -> Arc<dyn InventorySource> {
    tracing::warn!("no database configured; serving an empty in-memory inventory");
    Arc::new(InMemoryInventorySource::new())
}
