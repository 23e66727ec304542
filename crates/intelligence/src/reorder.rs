//! Reorder point calculator.
//!
//! ```text
//! expected lead-time demand  D_L = Σ_{h=1..L} ŷ_h
//! safety stock               SS  = z σ_d √L
//!   with lead-time std σ_L:  SS  = z √(L σ_d² + d̄² σ_L²),  d̄ = D_L / L
//! reorder point              ROP = D_L + SS
//! suggested order            max(ROP - stock, MOQ, 0), rounded up to the order unit
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use microfin_core::{BranchId, ProductId};

use crate::clock::Clock;
use crate::config::IntelligenceConfig;
use crate::decimal::{round, round_up_to_unit, to_decimal, to_f64};
use crate::error::{IntelligenceError, IntelligenceResult};
use crate::forecast::{ForecastEngine, ForecastMethod};
use crate::series::SeriesBuilder;
use crate::source::{InventorySource, ProductMetadata};
use crate::stats::{mean, service_level_z};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderPointResult {
    pub product_id: ProductId,
    pub branch_id: Option<BranchId>,
    pub lead_time_days: u32,
    pub expected_lead_time_demand: Decimal,
    pub safety_stock: Decimal,
    /// Always `expected_lead_time_demand + safety_stock`.
    pub reorder_point: Decimal,
    pub suggested_order_qty: Decimal,
    pub current_stock: Decimal,
    pub method: ForecastMethod,
    pub service_level: Decimal,
}

/// Safety stock for a per-day demand dispersion over a lead time.
///
/// `lead_time_spread` is `(mean daily demand, lead-time std in days)`; when
/// present the demand and lead-time variance contributions are combined.
pub fn safety_stock(z: f64, residual_std: f64, lead_time_days: f64, lead_time_spread: Option<(f64, f64)>) -> f64 {
    let sigma = residual_std.max(0.0);
    let l = lead_time_days.max(0.0);
    let ss = match lead_time_spread {
        Some((daily_demand, sigma_l)) if sigma_l > 0.0 => {
            z * (l * sigma * sigma + daily_demand * daily_demand * sigma_l * sigma_l).sqrt()
        }
        _ => z * sigma * l.sqrt(),
    };
    ss.max(0.0)
}

pub struct ReorderPointCalculator<S: ?Sized> {
    source: Arc<S>,
    builder: SeriesBuilder<S>,
    engine: ForecastEngine,
}

impl<S: ?Sized> Clone for ReorderPointCalculator<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            builder: self.builder.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<S> ReorderPointCalculator<S>
where
    S: InventorySource + ?Sized,
{
    pub fn new(source: Arc<S>, clock: Arc<dyn Clock>, config: IntelligenceConfig) -> Self {
        Self {
            builder: SeriesBuilder::new(source.clone(), clock),
            source,
            engine: ForecastEngine::new(config),
        }
    }

    fn config(&self) -> &IntelligenceConfig {
        self.engine.config()
    }

    /// Global reorder point (all branches).
    pub fn compute(&self, product_id: ProductId, lead_time_days: i64) -> IntelligenceResult<ReorderPointResult> {
        self.compute_for(product_id, None, lead_time_days)
    }

    /// Reorder point at a branch (or globally), with the configured method.
    pub fn compute_for(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        lead_time_days: i64,
    ) -> IntelligenceResult<ReorderPointResult> {
        let lead_time = self.validate_lead_time(lead_time_days)?;
        let metadata = self.source.product_metadata(product_id, branch_id)?;
        self.compute_from_metadata(&metadata, lead_time, self.config().default_method)
    }

    pub fn validate_lead_time(&self, lead_time_days: i64) -> IntelligenceResult<u32> {
        if lead_time_days <= 0 {
            return Err(IntelligenceError::invalid_input(format!(
                "lead_time_days must be > 0 (got {lead_time_days})"
            )));
        }
        let max = self.config().max_horizon_days;
        match u32::try_from(lead_time_days) {
            Ok(l) if l <= max => Ok(l),
            _ => Err(IntelligenceError::invalid_input(format!(
                "lead_time_days must be <= {max} (got {lead_time_days})"
            ))),
        }
    }

    /// Core computation against already-fetched metadata.
    pub fn compute_from_metadata(
        &self,
        metadata: &ProductMetadata,
        lead_time_days: u32,
        method: ForecastMethod,
    ) -> IntelligenceResult<ReorderPointResult> {
        let product_id = metadata.product_id;
        let branch_id = metadata.branch_id;
        if lead_time_days == 0 {
            return Err(IntelligenceError::invalid_input("lead_time_days must be > 0"));
        }

        let config = self.config();
        let z = service_level_z(config.service_level)
            .ok_or_else(|| IntelligenceError::invalid_input("service_level must lie in (0, 1)"))?;

        let lookback = config
            .reorder_lookback_days(lead_time_days)
            .max(config.minimum_periods(method) as u32);
        let series = self.builder.build_for(
            product_id,
            branch_id,
            lookback,
            config.minimum_periods(method),
        )?;

        let forecast = self
            .engine
            .forecast(&series, method, lead_time_days)
            .inspect_err(|e| {
                if matches!(e, IntelligenceError::ModelFit(_)) {
                    warn!(
                        product = %product_id,
                        branch = ?branch_id,
                        series_len = series.len(),
                        method = %method,
                        error = %e,
                        "reorder point forecast did not fit"
                    );
                }
            })?;

        let expected = round(forecast.total());
        let l = f64::from(lead_time_days);
        // Mean daily demand comes from the observed window so it does not
        // move with the lead time.
        let spread = metadata
            .lead_time_std_days
            .map(|sigma_l| (mean(&series.values()), to_f64(sigma_l)));
        let safety = to_decimal(safety_stock(z, to_f64(forecast.residual_std), l, spread));
        let reorder_point = expected + safety;

        let shortfall = reorder_point - metadata.current_stock;
        let suggested = round_up_to_unit(
            shortfall
                .max(metadata.minimum_order_quantity)
                .max(Decimal::ZERO),
            metadata.order_unit,
        );

        info!(
            product = %product_id,
            branch = ?branch_id,
            lead_time_days,
            method = %method,
            expected_lead_time_demand = %expected,
            safety_stock = %safety,
            reorder_point = %reorder_point,
            "reorder point computed"
        );

        Ok(ReorderPointResult {
            product_id,
            branch_id,
            lead_time_days,
            expected_lead_time_demand: expected,
            safety_stock: safety,
            reorder_point,
            suggested_order_qty: suggested,
            current_stock: metadata.current_stock,
            method,
            service_level: to_decimal(config.service_level),
        })
    }
}
