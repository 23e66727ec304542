use crate::error::{IntelligenceError, IntelligenceResult};
use crate::stats::rms;

use super::{ForecastMethod, Forecaster, RawForecast};

/// Simple exponential smoothing (level only, no trend).
///
/// ```text
/// l_0 = y_0
/// l_t = α y_t + (1 - α) l_{t-1}
/// ŷ_{T+h} = l_T
/// ```
///
/// Residual dispersion is the RMS of the one-step-ahead errors `y_t - l_{t-1}`.
/// The h-step interval uses `σ √(1 + (h-1) α²)`.
#[derive(Debug, Copy, Clone)]
pub struct ExponentialSmoothing {
    alpha: f64,
    z: f64,
}

impl ExponentialSmoothing {
    pub fn new(alpha: f64, z: f64) -> Self {
        Self { alpha, z }
    }

    /// Final level and the one-step-ahead errors.
    pub fn smooth(&self, values: &[f64]) -> (f64, Vec<f64>) {
        let mut level = values.first().copied().unwrap_or(0.0);
        let mut errors = Vec::with_capacity(values.len().saturating_sub(1));
        for y in values.iter().skip(1) {
            errors.push(y - level);
            level = self.alpha * y + (1.0 - self.alpha) * level;
        }
        (level, errors)
    }
}

impl Forecaster for ExponentialSmoothing {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::ExponentialSmoothing
    }

    fn minimum_periods(&self) -> usize {
        2
    }

    fn fit_predict(&self, values: &[f64], horizon: usize) -> IntelligenceResult<RawForecast> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(IntelligenceError::invalid_input(format!(
                "smoothing factor {} outside (0, 1)",
                self.alpha
            )));
        }

        let (level, errors) = self.smooth(values);
        let sigma = rms(&errors);

        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for h in 1..=horizon {
            let spread = self.z * sigma * (1.0 + (h as f64 - 1.0) * self.alpha * self.alpha).sqrt();
            lower.push(level - spread);
            upper.push(level + spread);
        }

        Ok(RawForecast {
            point: vec![level; horizon],
            interval: Some((lower, upper)),
            residual_std: sigma,
            order: None,
        })
    }
}
