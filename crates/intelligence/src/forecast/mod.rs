//! Forecasting engine.
//!
//! The method set is closed: [`ForecastMethod`] names it and
//! [`ForecastEngine`] maps each variant to one [`Forecaster`] strategy.
//! Strategies work on plain `f64` values; the engine owns horizon validation,
//! minimum-length checks, clamping and conversion to reported decimals.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::IntelligenceConfig;
use crate::decimal::to_decimal;
use crate::error::{IntelligenceError, IntelligenceResult};
use crate::series::DemandSeries;
use crate::stats::interval_z;

pub mod arima;
pub mod exponential_smoothing;
pub mod moving_average;
mod optimize;

pub use arima::Arima;
pub use exponential_smoothing::ExponentialSmoothing;
pub use moving_average::MovingAverage;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    MovingAverage,
    ExponentialSmoothing,
    Arima,
}

impl ForecastMethod {
    pub const ALL: [ForecastMethod; 3] = [
        ForecastMethod::MovingAverage,
        ForecastMethod::ExponentialSmoothing,
        ForecastMethod::Arima,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::MovingAverage => "moving_average",
            ForecastMethod::ExponentialSmoothing => "exponential_smoothing",
            ForecastMethod::Arima => "arima",
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastMethod {
    type Err = IntelligenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "moving_average" => Ok(ForecastMethod::MovingAverage),
            "exponential_smoothing" => Ok(ForecastMethod::ExponentialSmoothing),
            "arima" => Ok(ForecastMethod::Arima),
            _ => Err(IntelligenceError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// ARIMA (p, d, q) order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: u8,
    pub d: u8,
    pub q: u8,
}

impl ArimaOrder {
    pub const fn new(p: u8, d: u8, q: u8) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub method: ForecastMethod,
    pub horizon_days: u32,
    /// One entry per future day.
    pub point_forecast: Vec<Decimal>,
    /// Empty when the method gives no interval.
    pub lower_bound: Vec<Decimal>,
    pub upper_bound: Vec<Decimal>,
    pub residual_std: Decimal,
    /// Coverage of the interval, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<ArimaOrder>,
}

impl ForecastResult {
    pub fn has_interval(&self) -> bool {
        !self.lower_bound.is_empty()
    }

    /// Sum of the point forecast.
    pub fn total(&self) -> Decimal {
        self.point_forecast.iter().copied().sum()
    }
}

/// Strategy output before clamping/rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecast {
    pub point: Vec<f64>,
    /// `(lower, upper)`, parallel to `point`.
    pub interval: Option<(Vec<f64>, Vec<f64>)>,
    pub residual_std: f64,
    pub order: Option<ArimaOrder>,
}

/// A forecasting strategy.
pub trait Forecaster {
    fn method(&self) -> ForecastMethod;

    /// Shortest series this strategy accepts.
    fn minimum_periods(&self) -> usize;

    /// Fit on `values` (oldest first) and forecast `horizon` steps.
    /// Callers guarantee `values.len() >= minimum_periods()` and `horizon >= 1`.
    fn fit_predict(&self, values: &[f64], horizon: usize) -> IntelligenceResult<RawForecast>;
}

/// Dispatches a [`ForecastMethod`] to its strategy.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: IntelligenceConfig,
}

impl ForecastEngine {
    pub fn new(config: IntelligenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IntelligenceConfig {
        &self.config
    }

    pub fn validate_horizon(&self, horizon_days: u32) -> IntelligenceResult<()> {
        if horizon_days == 0 || horizon_days > self.config.max_horizon_days {
            return Err(IntelligenceError::InvalidHorizon {
                requested: horizon_days,
                max: self.config.max_horizon_days,
            });
        }
        Ok(())
    }

    pub fn forecast(
        &self,
        series: &DemandSeries,
        method: ForecastMethod,
        horizon_days: u32,
    ) -> IntelligenceResult<ForecastResult> {
        self.validate_horizon(horizon_days)?;

        let z = interval_z(self.config.confidence_level).ok_or_else(|| {
            IntelligenceError::invalid_input("confidence_level must lie in (0, 1)")
        })?;

        let raw = match method {
            ForecastMethod::MovingAverage => {
                self.run(&MovingAverage::new(self.config.moving_average_window), series, horizon_days)
            }
            ForecastMethod::ExponentialSmoothing => self.run(
                &ExponentialSmoothing::new(self.config.smoothing_alpha, z),
                series,
                horizon_days,
            ),
            ForecastMethod::Arima => self.run(
                &Arima::new(
                    self.config.arima_min_periods,
                    self.config.arima_max_iterations,
                    self.config.arima_fit_timeout,
                    z,
                ),
                series,
                horizon_days,
            ),
        }?;

        finish(method, horizon_days, raw, self.config.confidence_level)
    }

    fn run(
        &self,
        strategy: &dyn Forecaster,
        series: &DemandSeries,
        horizon_days: u32,
    ) -> IntelligenceResult<RawForecast> {
        let required = strategy.minimum_periods();
        if series.len() < required {
            return Err(IntelligenceError::insufficient(required, series.len()));
        }

        let values = series.values();
        let result = strategy.fit_predict(&values, horizon_days as usize);
        match &result {
            Ok(raw) => debug!(
                method = %strategy.method(),
                series_len = values.len(),
                horizon_days,
                residual_std = raw.residual_std,
                "forecast computed"
            ),
            Err(e) => warn!(
                method = %strategy.method(),
                series_len = values.len(),
                horizon_days,
                error = %e,
                "forecast failed"
            ),
        }
        result
    }
}

fn finish(
    method: ForecastMethod,
    horizon_days: u32,
    raw: RawForecast,
    confidence_level: f64,
) -> IntelligenceResult<ForecastResult> {
    let horizon = horizon_days as usize;
    if raw.point.len() != horizon {
        return Err(IntelligenceError::model_fit(format!(
            "{method} produced {} values for a {horizon}-day horizon",
            raw.point.len()
        )));
    }
    if !raw.residual_std.is_finite() || raw.point.iter().any(|v| !v.is_finite()) {
        return Err(IntelligenceError::model_fit(format!(
            "{method} produced non-finite output"
        )));
    }

    // Demand cannot be negative.
    let point: Vec<f64> = raw.point.iter().map(|v| v.max(0.0)).collect();

    let (lower_bound, upper_bound, confidence) = match raw.interval {
        Some((lower, upper)) => {
            if lower.len() != horizon
                || upper.len() != horizon
                || lower.iter().chain(upper.iter()).any(|v| !v.is_finite())
            {
                return Err(IntelligenceError::model_fit(format!(
                    "{method} produced a malformed interval"
                )));
            }
            let lo = lower
                .iter()
                .zip(&point)
                .map(|(l, p)| to_decimal(l.max(0.0).min(*p)))
                .collect();
            let hi = upper
                .iter()
                .zip(&point)
                .map(|(u, p)| to_decimal(u.max(*p)))
                .collect();
            (lo, hi, Some(to_decimal(confidence_level)))
        }
        None => (Vec::new(), Vec::new(), None),
    };

    Ok(ForecastResult {
        method,
        horizon_days,
        point_forecast: point.into_iter().map(to_decimal).collect(),
        lower_bound,
        upper_bound,
        residual_std: to_decimal(raw.residual_std.max(0.0)),
        confidence_level: confidence,
        order: raw.order,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::decimal::to_decimal;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn series(values: &[f64]) -> DemandSeries {
        let qty: Vec<Decimal> = values.iter().map(|v| to_decimal(*v)).collect();
        DemandSeries::from_daily(start(), &qty).unwrap()
    }

    fn engine() -> ForecastEngine {
        ForecastEngine::new(IntelligenceConfig::default())
    }

    #[test]
    fn serializes_decimals_as_strings() {
        let result = engine()
            .forecast(&series(&[4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0]), ForecastMethod::MovingAverage, 2)
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["method"], "moving_average");
        let first: Decimal = json["point_forecast"][0].as_str().unwrap().parse().unwrap();
        assert_eq!(first, dec!(4));
        assert!(json.get("order").is_none());
    }

    #[test]
    fn parses_method_names() {
        assert_eq!("moving_average".parse::<ForecastMethod>().unwrap(), ForecastMethod::MovingAverage);
        assert_eq!(
            "Exponential-Smoothing".parse::<ForecastMethod>().unwrap(),
            ForecastMethod::ExponentialSmoothing
        );
        assert_eq!("arima".parse::<ForecastMethod>().unwrap(), ForecastMethod::Arima);
        let err = "prophet".parse::<ForecastMethod>().unwrap_err();
        assert_eq!(err, IntelligenceError::UnsupportedMethod("prophet".into()));
    }

    #[test]
    fn constant_week_moving_average_scenario() {
        let s = series(&[10.0; 7]);
        let f = engine().forecast(&s, ForecastMethod::MovingAverage, 3).unwrap();
        assert_eq!(f.point_forecast, vec![dec!(10), dec!(10), dec!(10)]);
        assert_eq!(f.residual_std, dec!(0));
        assert!(!f.has_interval());
        assert_eq!(f.horizon_days, 3);
    }

    #[test]
    fn arima_on_five_days_is_insufficient() {
        let s = series(&[3.0, 4.0, 5.0, 4.0, 3.0]);
        let err = engine().forecast(&s, ForecastMethod::Arima, 7).unwrap_err();
        assert_eq!(err, IntelligenceError::insufficient(14, 5));
    }

    #[test]
    fn moving_average_needs_a_full_window() {
        let s = series(&[1.0, 2.0, 3.0]);
        let err = engine().forecast(&s, ForecastMethod::MovingAverage, 1).unwrap_err();
        assert_eq!(err, IntelligenceError::insufficient(7, 3));
    }

    #[test]
    fn horizon_outside_bounds_is_rejected() {
        let s = series(&[1.0; 10]);
        for h in [0, 366] {
            let err = engine().forecast(&s, ForecastMethod::ExponentialSmoothing, h).unwrap_err();
            assert_eq!(
                err,
                IntelligenceError::InvalidHorizon {
                    requested: h,
                    max: 365
                }
            );
        }
        assert!(engine().forecast(&s, ForecastMethod::ExponentialSmoothing, 365).is_ok());
    }

    #[test]
    fn negative_projections_clamp_to_zero() {
        // Steep decline toward zero.
        let values: Vec<f64> = (0..30).map(|i| (60.0 - 2.0 * i as f64).max(0.0)).collect();
        let f = engine().forecast(&series(&values), ForecastMethod::Arima, 60).unwrap();
        assert!(f.point_forecast.iter().all(|v| *v >= Decimal::ZERO));
        assert!(f.lower_bound.iter().all(|v| *v >= Decimal::ZERO));
    }

    #[test]
    fn bounds_bracket_the_point_forecast() {
        let values: Vec<f64> = (0..40).map(|i| 20.0 + ((i * 7) % 5) as f64).collect();
        for method in [ForecastMethod::ExponentialSmoothing, ForecastMethod::Arima] {
            let f = engine().forecast(&series(&values), method, 10).unwrap();
            assert!(f.has_interval());
            for i in 0..10 {
                assert!(f.lower_bound[i] <= f.point_forecast[i]);
                assert!(f.point_forecast[i] <= f.upper_bound[i]);
            }
            assert_eq!(f.confidence_level, Some(dec!(0.95)));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: every method yields exactly `horizon` non-negative values.
        #[test]
        fn forecast_has_horizon_entries_all_non_negative(
            values in prop::collection::vec(0.0f64..500.0, 14..60),
            horizon in 1u32..60,
        ) {
            let s = series(&values);
            for method in ForecastMethod::ALL {
                match engine().forecast(&s, method, horizon) {
                    Ok(f) => {
                        prop_assert_eq!(f.point_forecast.len(), horizon as usize);
                        prop_assert!(f.point_forecast.iter().all(|v| *v >= Decimal::ZERO));
                        prop_assert!(f.residual_std >= Decimal::ZERO);
                    }
                    Err(IntelligenceError::ModelFit(_)) => {}
                    Err(e) => prop_assert!(false, "unexpected error: {e}"),
                }
            }
        }

        /// Property: a constant series forecasts the constant under any window.
        #[test]
        fn moving_average_is_idempotent_on_constant_input(
            v in 0u32..10_000,
            window in 1usize..30,
            horizon in 1u32..30,
        ) {
            let cfg = IntelligenceConfig::default().with_moving_average_window(window);
            let s = series(&vec![f64::from(v); window + 3]);
            let f = ForecastEngine::new(cfg).forecast(&s, ForecastMethod::MovingAverage, horizon).unwrap();
            let expected = Decimal::from(v);
            prop_assert!(f.point_forecast.iter().all(|p| *p == expected));
            prop_assert_eq!(f.residual_std, Decimal::ZERO);
        }
    }
}
