//! ARIMA(p, 1, q) with p, q ∈ {0, 1}.
//!
//! The series is differenced once; an ARMA(p, q) model without constant is
//! fitted to the differences by conditional sum of squares (CSS):
//!
//! ```text
//! w_t = y_t - y_{t-1}
//! w_t = φ w_{t-1} + e_t + θ e_{t-1}
//! ```
//!
//! The order is the candidate with minimum AIC. Forecasts integrate the ARMA
//! projection back to levels; the h-step variance is
//! `σ² Σ_{j<h} Ψ_j²` with `Ψ_j` the cumulative ψ-weights, so bounds widen with
//! the horizon.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{IntelligenceError, IntelligenceResult};

use super::optimize::{FitFailure, Limits, nelder_mead};
use super::{ArimaOrder, ForecastMethod, Forecaster, RawForecast};

/// Stationarity/invertibility bound on |φ| and |θ|.
const COEF_BOUND: f64 = 0.98;
const PENALTY: f64 = 1.0e12;

pub const CANDIDATE_ORDERS: [ArimaOrder; 3] = [
    ArimaOrder::new(0, 1, 1),
    ArimaOrder::new(1, 1, 0),
    ArimaOrder::new(1, 1, 1),
];

#[derive(Debug, Clone)]
pub struct Arima {
    min_periods: usize,
    max_iterations: usize,
    timeout: Duration,
    z: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct FittedArma {
    order: ArimaOrder,
    phi: f64,
    theta: f64,
    sigma2: f64,
    aic: f64,
    last_residual: f64,
}

impl Arima {
    pub fn new(min_periods: usize, max_iterations: usize, timeout: Duration, z: f64) -> Self {
        Self {
            min_periods: min_periods.max(4),
            max_iterations,
            timeout,
            z,
        }
    }

    fn fit(&self, diffs: &[f64], order: ArimaOrder, deadline: Instant) -> Result<FittedArma, String> {
        let ar = order.p == 1;
        let ma = order.q == 1;
        let k = usize::from(ar) + usize::from(ma);

        let unpack = |x: &[f64]| -> (f64, f64) {
            match (ar, ma) {
                (true, true) => (x[0], x[1]),
                (true, false) => (x[0], 0.0),
                (false, true) => (0.0, x[0]),
                (false, false) => (0.0, 0.0),
            }
        };
        let objective = |x: &[f64]| {
            if x.iter().any(|c| c.abs() >= COEF_BOUND) {
                return PENALTY;
            }
            let (phi, theta) = unpack(x);
            css(diffs, ar, phi, theta).0
        };

        let limits = Limits {
            max_iterations: self.max_iterations,
            deadline,
            f_tol: 1e-10,
            x_tol: 1e-6,
        };
        let start = vec![0.1; k];
        let minimum = nelder_mead(objective, &start, 0.2, limits).map_err(|e: FitFailure| e.to_string())?;

        let (phi, theta) = unpack(&minimum.x);
        let (sse, residuals) = css(diffs, ar, phi, theta);
        let m = residuals.len();
        if m <= k {
            return Err(format!("{} residuals cannot identify {k} parameters", m));
        }
        let sigma2 = sse / (m - k) as f64;
        if !sigma2.is_finite() || sse >= PENALTY {
            return Err("no admissible parameters".to_string());
        }
        let aic = m as f64 * (sse.max(1e-12) / m as f64).ln() + 2.0 * k as f64;

        debug!(
            order = %order,
            phi,
            theta,
            sigma2,
            aic,
            iterations = minimum.iterations,
            "arima candidate fitted"
        );

        Ok(FittedArma {
            order,
            phi,
            theta,
            sigma2,
            aic,
            last_residual: residuals.last().copied().unwrap_or(0.0),
        })
    }
}

/// Conditional sum of squares and residuals, with pre-sample errors at zero.
fn css(w: &[f64], ar: bool, phi: f64, theta: f64) -> (f64, Vec<f64>) {
    let start = usize::from(ar);
    let mut residuals = Vec::with_capacity(w.len().saturating_sub(start));
    let mut prev_e = 0.0;
    let mut sse = 0.0;
    for t in start..w.len() {
        let ar_term = if ar { phi * w[t - 1] } else { 0.0 };
        let e = w[t] - ar_term - theta * prev_e;
        sse += e * e;
        residuals.push(e);
        prev_e = e;
    }
    (sse, residuals)
}

impl Forecaster for Arima {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::Arima
    }

    fn minimum_periods(&self) -> usize {
        self.min_periods
    }

    fn fit_predict(&self, values: &[f64], horizon: usize) -> IntelligenceResult<RawForecast> {
        let diffs: Vec<f64> = values.windows(2).map(|p| p[1] - p[0]).collect();
        let deadline = Instant::now() + self.timeout;

        let mut best: Option<FittedArma> = None;
        let mut failures: Vec<String> = Vec::new();
        for order in CANDIDATE_ORDERS {
            match self.fit(&diffs, order, deadline) {
                Ok(fitted) => {
                    if best.as_ref().is_none_or(|b| fitted.aic < b.aic) {
                        best = Some(fitted);
                    }
                }
                Err(e) => failures.push(format!("{order}: {e}")),
            }
        }

        let Some(model) = best else {
            return Err(IntelligenceError::model_fit(format!(
                "no ARIMA candidate converged on {} periods ({})",
                values.len(),
                failures.join("; ")
            )));
        };

        let last_level = values.last().copied().unwrap_or(0.0);
        let last_diff = diffs.last().copied().unwrap_or(0.0);

        // ψ-weights of the ARMA part, accumulated for the integration.
        let mut point = Vec::with_capacity(horizon);
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);

        let mut level = last_level;
        let mut w_prev = last_diff;
        let mut psi = 1.0;
        let mut cum_psi = 0.0;
        let mut var_sum = 0.0;
        for h in 1..=horizon {
            let w_hat = if h == 1 {
                model.phi * w_prev + model.theta * model.last_residual
            } else {
                model.phi * w_prev
            };
            level += w_hat;
            w_prev = w_hat;

            if h == 2 {
                psi = model.phi + model.theta;
            } else if h > 2 {
                psi *= model.phi;
            }
            cum_psi += psi;
            var_sum += cum_psi * cum_psi;

            let spread = self.z * (model.sigma2 * var_sum).sqrt();
            point.push(level);
            lower.push(level - spread);
            upper.push(level + spread);
        }

        Ok(RawForecast {
            point,
            interval: Some((lower, upper)),
            residual_std: model.sigma2.sqrt(),
            order: Some(model.order),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arima() -> Arima {
        Arima::new(14, 500, Duration::from_secs(2), 1.96)
    }

    /// Deterministic pseudo-noise in [-1, 1).
    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn recovers_an_ar1_coefficient_on_differences() {
        let e = noise(400, 7);
        let mut w = vec![0.0];
        for t in 1..400 {
            w.push(0.6 * w[t - 1] + e[t]);
        }
        let (sse_true, _) = css(&w, true, 0.6, 0.0);
        let fitted = arima()
            .fit(&w, ArimaOrder::new(1, 1, 0), Instant::now() + Duration::from_secs(2))
            .unwrap();
        assert!((fitted.phi - 0.6).abs() < 0.1, "phi = {}", fitted.phi);
        let (sse_fit, _) = css(&w, true, fitted.phi, 0.0);
        assert!(sse_fit <= sse_true + 1e-6);
    }

    #[test]
    fn bounds_widen_with_horizon() {
        let values: Vec<f64> = noise(60, 3).iter().map(|e| 50.0 + 5.0 * e).collect();
        let f = arima().fit_predict(&values, 12).unwrap();
        let (lower, upper) = f.interval.unwrap();
        for h in 1..12 {
            assert!(upper[h] - lower[h] >= upper[h - 1] - lower[h - 1]);
        }
        assert!(upper[11] - lower[11] > upper[0] - lower[0]);
        assert_eq!(f.point.len(), 12);
        assert!(f.order.is_some());
    }

    #[test]
    fn constant_series_forecasts_the_constant() {
        let f = arima().fit_predict(&[12.0; 20], 5).unwrap();
        for v in f.point {
            assert!((v - 12.0).abs() < 1e-9);
        }
        assert!(f.residual_std.abs() < 1e-9);
    }

    #[test]
    fn iteration_cap_surfaces_as_model_fit_error() {
        let values: Vec<f64> = noise(40, 11).iter().map(|e| 30.0 + 10.0 * e).collect();
        let starved = Arima::new(14, 1, Duration::from_secs(2), 1.96);
        let err = starved.fit_predict(&values, 3).unwrap_err();
        assert!(matches!(err, IntelligenceError::ModelFit(_)));
    }

    #[test]
    fn exhausted_time_budget_surfaces_as_model_fit_error() {
        let values: Vec<f64> = noise(40, 5).iter().map(|e| 30.0 + 10.0 * e).collect();
        let rushed = Arima::new(14, 500, Duration::ZERO, 1.96);
        let err = rushed.fit_predict(&values, 3).unwrap_err();
        assert!(matches!(err, IntelligenceError::ModelFit(_)));
    }
}
