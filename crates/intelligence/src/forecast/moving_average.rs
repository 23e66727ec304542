use crate::error::IntelligenceResult;
use crate::stats::{mean, stddev_sample};

use super::{ForecastMethod, Forecaster, RawForecast};

/// Flat forecast at the mean of the last `window` periods. No interval.
#[derive(Debug, Copy, Clone)]
pub struct MovingAverage {
    window: usize,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl Forecaster for MovingAverage {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::MovingAverage
    }

    fn minimum_periods(&self) -> usize {
        self.window
    }

    fn fit_predict(&self, values: &[f64], horizon: usize) -> IntelligenceResult<RawForecast> {
        let tail = &values[values.len().saturating_sub(self.window)..];
        let level = mean(tail);
        Ok(RawForecast {
            point: vec![level; horizon],
            interval: None,
            residual_std: stddev_sample(tail, level),
            order: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_only_the_trailing_window() {
        let ma = MovingAverage::new(3);
        let f = ma.fit_predict(&[100.0, 100.0, 1.0, 2.0, 3.0], 2).unwrap();
        assert_eq!(f.point, vec![2.0, 2.0]);
        assert!((f.residual_std - 1.0).abs() < 1e-12);
        assert!(f.interval.is_none());
    }

    #[test]
    fn window_of_one_is_last_value() {
        let f = MovingAverage::new(1).fit_predict(&[4.0, 9.0], 3).unwrap();
        assert_eq!(f.point, vec![9.0; 3]);
        assert_eq!(f.residual_std, 0.0);
    }
}
