use thiserror::Error;

use crate::source::SourceError;

pub type IntelligenceResult<T> = Result<T, IntelligenceError>;

/// Failure taxonomy of the inventory intelligence core.
///
/// Only the recommendation engine downgrades an item-level error into a
/// non-fatal exclusion; every other stage propagates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntelligenceError {
    /// Caller error (non-positive lead time, zero lookback, malformed series).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Horizon outside `1..=max`.
    #[error("invalid horizon: {requested} days (allowed 1..={max})")]
    InvalidHorizon { requested: u32, max: u32 },

    /// Not enough history to produce a number; never defaulted.
    #[error("insufficient data: need {required} periods of history, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("unsupported forecasting method: {0}")]
    UnsupportedMethod(String),

    /// Numerical failure while fitting. Retryable with a simpler method.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    /// Unknown product or branch.
    #[error("not found: {0}")]
    NotFound(String),

    /// The persistence collaborator could not answer.
    #[error("data source unavailable: {0}")]
    Source(String),
}

impl IntelligenceError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn model_fit(msg: impl Into<String>) -> Self {
        Self::ModelFit(msg.into())
    }

    pub fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }

    /// Periods of history still missing, for `InsufficientData`.
    pub fn missing_periods(&self) -> Option<usize> {
        match self {
            Self::InsufficientData {
                required,
                available,
            } => Some(required.saturating_sub(*available)),
            _ => None,
        }
    }

    /// Caller errors, as opposed to data or numerical conditions.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::InvalidHorizon { .. } | Self::UnsupportedMethod(_)
        )
    }
}

impl From<SourceError> for IntelligenceError {
    fn from(value: SourceError) -> Self {
        match value {
            SourceError::NotFound(what) => Self::NotFound(what),
            SourceError::Unavailable(msg) => Self::Source(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_periods_reports_the_shortfall() {
        let err = IntelligenceError::insufficient(14, 5);
        assert_eq!(err.missing_periods(), Some(9));
        assert_eq!(IntelligenceError::model_fit("x").missing_periods(), None);
    }

    #[test]
    fn source_not_found_stays_distinct_from_insufficient_data() {
        let err: IntelligenceError = SourceError::NotFound("product 42".into()).into();
        assert_eq!(err, IntelligenceError::NotFound("product 42".into()));
        assert!(!err.is_client_error());
    }
}
