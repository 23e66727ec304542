//! Request-facing facade over the intelligence stages.
//!
//! All collaborators are injected; nothing here is process-global.

use std::sync::Arc;

use tracing::warn;

use microfin_core::{BranchId, ProductId};

use crate::cache::{ForecastCache, ForecastKey};
use crate::clock::{Clock, SystemClock};
use crate::config::IntelligenceConfig;
use crate::error::{IntelligenceError, IntelligenceResult};
use crate::forecast::{ForecastEngine, ForecastMethod, ForecastResult};
use crate::recommend::{Page, RecommendationEngine, RecommendationReport};
use crate::reorder::{ReorderPointCalculator, ReorderPointResult};
use crate::series::SeriesBuilder;
use crate::source::InventorySource;

pub struct InventoryIntelligence<S: ?Sized> {
    source: Arc<S>,
    config: IntelligenceConfig,
    builder: SeriesBuilder<S>,
    engine: ForecastEngine,
    calculator: ReorderPointCalculator<S>,
    recommendations: RecommendationEngine<S>,
    cache: ForecastCache,
}

impl<S> InventoryIntelligence<S>
where
    S: InventorySource + ?Sized,
{
    pub fn new(source: Arc<S>, config: IntelligenceConfig) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), config)
    }

    pub fn with_clock(source: Arc<S>, clock: Arc<dyn Clock>, config: IntelligenceConfig) -> Self {
        Self {
            builder: SeriesBuilder::new(source.clone(), clock.clone()),
            engine: ForecastEngine::new(config.clone()),
            calculator: ReorderPointCalculator::new(source.clone(), clock.clone(), config.clone()),
            recommendations: RecommendationEngine::new(source.clone(), clock, config.clone()),
            cache: ForecastCache::new(config.forecast_cache_ttl, config.forecast_cache_capacity),
            source,
            config,
        }
    }

    pub fn config(&self) -> &IntelligenceConfig {
        &self.config
    }

    /// Forecast endpoint: series builder + forecasting engine.
    pub fn forecast(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        horizon_days: u32,
        method: ForecastMethod,
    ) -> IntelligenceResult<ForecastResult> {
        self.engine.validate_horizon(horizon_days)?;

        // Unknown products must not look like products without history.
        self.source.product_metadata(product_id, branch_id)?;

        let minimum = self.config.minimum_periods(method);
        let lookback = self.config.forecast_lookback_days.max(minimum as u32);
        let key = ForecastKey {
            product_id,
            branch_id,
            method,
            horizon_days,
            lookback_days: lookback,
        };
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let series = self.builder.build_for(product_id, branch_id, lookback, minimum)?;
        let result = self
            .engine
            .forecast(&series, method, horizon_days)
            .inspect_err(|e| {
                if matches!(e, IntelligenceError::ModelFit(_)) {
                    warn!(
                        product = %product_id,
                        branch = ?branch_id,
                        series_len = series.len(),
                        method = %method,
                        error = %e,
                        "forecast did not fit"
                    );
                }
            })?;

        self.cache.insert(key, result.clone());
        Ok(result)
    }

    /// Reorder-point endpoint.
    pub fn reorder_point(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        lead_time_days: i64,
    ) -> IntelligenceResult<ReorderPointResult> {
        self.calculator.compute_for(product_id, branch_id, lead_time_days)
    }

    /// Recommendations endpoint. An empty candidate list means every stocked
    /// product.
    pub fn recommendations(
        &self,
        branch_id: Option<BranchId>,
        candidate_products: &[ProductId],
        page: Page,
    ) -> IntelligenceResult<RecommendationReport> {
        let listed;
        let candidates = if candidate_products.is_empty() {
            listed = self.source.list_products()?;
            &listed[..]
        } else {
            candidate_products
        };
        Ok(self.recommendations.recommend_page(branch_id, candidates, page))
    }
}
