//! Tunables for forecasting, reorder points and recommendations.

use std::time::Duration;

use thiserror::Error;

use crate::forecast::ForecastMethod;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}={value:?} is not valid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    OutOfRange(String),
}

/// Inventory intelligence configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct IntelligenceConfig {
    /// Window W of the moving-average forecast.
    pub moving_average_window: usize,
    /// Smoothing factor α of simple exponential smoothing, in (0, 1).
    pub smoothing_alpha: f64,
    /// Shortest series the ARIMA fit accepts.
    pub arima_min_periods: usize,
    /// Optimizer iteration cap per candidate model.
    pub arima_max_iterations: usize,
    /// Wall-clock cap for the whole ARIMA order search.
    pub arima_fit_timeout: Duration,
    pub max_horizon_days: u32,
    /// Coverage of reported forecast intervals.
    pub confidence_level: f64,
    /// Target probability of not stocking out during lead time.
    pub service_level: f64,
    /// Method the reorder point calculator forecasts with.
    pub default_method: ForecastMethod,
    /// Method retried once when the default fails to fit.
    pub fallback_method: ForecastMethod,
    /// Reorder lookback covers at least `lead_time * multiplier` days...
    pub lookback_multiplier: u32,
    /// ...and never less than this.
    pub min_lookback_days: u32,
    /// History window for the forecast endpoint.
    pub forecast_lookback_days: u32,
    /// Worker count for the recommendation fan-out.
    pub max_concurrency: usize,
    /// Zero disables forecast memoization.
    pub forecast_cache_ttl: Duration,
    pub forecast_cache_capacity: usize,
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            moving_average_window: 7,
            smoothing_alpha: 0.3,
            arima_min_periods: 14,
            arima_max_iterations: 500,
            arima_fit_timeout: Duration::from_secs(2),
            max_horizon_days: 365,
            confidence_level: 0.95,
            service_level: 0.95,
            default_method: ForecastMethod::ExponentialSmoothing,
            fallback_method: ForecastMethod::ExponentialSmoothing,
            lookback_multiplier: 3,
            min_lookback_days: 30,
            forecast_lookback_days: 90,
            max_concurrency: 4,
            forecast_cache_ttl: Duration::from_secs(60),
            forecast_cache_capacity: 1024,
        }
    }
}

impl IntelligenceConfig {
    pub fn with_moving_average_window(mut self, window: usize) -> Self {
        self.moving_average_window = window;
        self
    }

    pub fn with_smoothing_alpha(mut self, alpha: f64) -> Self {
        self.smoothing_alpha = alpha;
        self
    }

    pub fn with_service_level(mut self, level: f64) -> Self {
        self.service_level = level;
        self
    }

    pub fn with_default_method(mut self, method: ForecastMethod) -> Self {
        self.default_method = method;
        self
    }

    pub fn with_fallback_method(mut self, method: ForecastMethod) -> Self {
        self.fallback_method = method;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_forecast_cache_ttl(mut self, ttl: Duration) -> Self {
        self.forecast_cache_ttl = ttl;
        self
    }

    pub fn with_arima_fit_limits(mut self, max_iterations: usize, timeout: Duration) -> Self {
        self.arima_max_iterations = max_iterations;
        self.arima_fit_timeout = timeout;
        self
    }

    /// Minimum number of periods a method needs, under this configuration.
    pub fn minimum_periods(&self, method: ForecastMethod) -> usize {
        match method {
            ForecastMethod::MovingAverage => self.moving_average_window.max(1),
            ForecastMethod::ExponentialSmoothing => 2,
            ForecastMethod::Arima => self.arima_min_periods.max(4),
        }
    }

    /// History window (days) for a reorder computation with this lead time.
    pub fn reorder_lookback_days(&self, lead_time_days: u32) -> u32 {
        lead_time_days
            .saturating_mul(self.lookback_multiplier)
            .max(self.min_lookback_days)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.moving_average_window == 0 {
            return Err(ConfigError::OutOfRange(
                "moving_average_window must be >= 1".to_string(),
            ));
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha < 1.0) {
            return Err(ConfigError::OutOfRange(
                "smoothing_alpha must lie in (0, 1)".to_string(),
            ));
        }
        if self.arima_max_iterations == 0 {
            return Err(ConfigError::OutOfRange(
                "arima_max_iterations must be >= 1".to_string(),
            ));
        }
        if self.max_horizon_days == 0 {
            return Err(ConfigError::OutOfRange(
                "max_horizon_days must be >= 1".to_string(),
            ));
        }
        for (name, p) in [
            ("confidence_level", self.confidence_level),
            ("service_level", self.service_level),
        ] {
            if !(p > 0.0 && p < 1.0) {
                return Err(ConfigError::OutOfRange(format!("{name} must lie in (0, 1)")));
            }
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::OutOfRange(
                "max_concurrency must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from `MICROFIN_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup over the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = parsed(&lookup, "MICROFIN_MA_WINDOW")? {
            cfg.moving_average_window = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_SMOOTHING_ALPHA")? {
            cfg.smoothing_alpha = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_ARIMA_MIN_PERIODS")? {
            cfg.arima_min_periods = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_ARIMA_MAX_ITERATIONS")? {
            cfg.arima_max_iterations = v;
        }
        if let Some(v) = parsed::<u64, _>(&lookup, "MICROFIN_ARIMA_FIT_TIMEOUT_MS")? {
            cfg.arima_fit_timeout = Duration::from_millis(v);
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_MAX_HORIZON_DAYS")? {
            cfg.max_horizon_days = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_CONFIDENCE_LEVEL")? {
            cfg.confidence_level = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_SERVICE_LEVEL")? {
            cfg.service_level = v;
        }
        if let Some(v) = method(&lookup, "MICROFIN_DEFAULT_METHOD")? {
            cfg.default_method = v;
        }
        if let Some(v) = method(&lookup, "MICROFIN_FALLBACK_METHOD")? {
            cfg.fallback_method = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_LOOKBACK_MULTIPLIER")? {
            cfg.lookback_multiplier = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_MIN_LOOKBACK_DAYS")? {
            cfg.min_lookback_days = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_FORECAST_LOOKBACK_DAYS")? {
            cfg.forecast_lookback_days = v;
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_MAX_CONCURRENCY")? {
            cfg.max_concurrency = v;
        }
        if let Some(v) = parsed::<u64, _>(&lookup, "MICROFIN_FORECAST_CACHE_TTL_SECS")? {
            cfg.forecast_cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = parsed(&lookup, "MICROFIN_FORECAST_CACHE_CAPACITY")? {
            cfg.forecast_cache_capacity = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parsed<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn method<F>(lookup: &F, key: &'static str) -> Result<Option<ForecastMethod>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<ForecastMethod>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
