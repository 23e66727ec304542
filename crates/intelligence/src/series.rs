//! Demand series: a contiguous, zero-filled daily quantity series.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use microfin_core::{BranchId, ProductId};

use crate::clock::Clock;
use crate::decimal::to_f64;
use crate::error::{IntelligenceError, IntelligenceResult};
use crate::source::TransactionHistory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub period_start: NaiveDate,
    pub quantity: Decimal,
}

/// One entry per day, no gaps, no duplicates, no negative quantities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandSeries {
    points: Vec<DemandPoint>,
}

impl DemandSeries {
    /// Validate and wrap a series.
    pub fn new(points: Vec<DemandPoint>) -> IntelligenceResult<Self> {
        for pair in points.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.period_start != prev.period_start + Duration::days(1) {
                return Err(IntelligenceError::invalid_input(format!(
                    "demand series must be contiguous daily periods ({} followed by {})",
                    prev.period_start, next.period_start
                )));
            }
        }
        if let Some(p) = points.iter().find(|p| p.quantity < Decimal::ZERO) {
            return Err(IntelligenceError::invalid_input(format!(
                "negative demand {} on {}",
                p.quantity, p.period_start
            )));
        }
        Ok(Self { points })
    }

    /// Daily series starting at `start`.
    pub fn from_daily(start: NaiveDate, quantities: &[Decimal]) -> IntelligenceResult<Self> {
        let points = quantities
            .iter()
            .enumerate()
            .map(|(i, q)| DemandPoint {
                period_start: start + Duration::days(i as i64),
                quantity: *q,
            })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[DemandPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_period(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.period_start)
    }

    pub fn last_period(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.period_start)
    }

    /// Periods with any demand.
    pub fn nonzero_periods(&self) -> usize {
        self.points.iter().filter(|p| !p.quantity.is_zero()).count()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| to_f64(p.quantity)).collect()
    }
}

/// Builds demand series from the transaction history collaborator.
pub struct SeriesBuilder<S: ?Sized> {
    source: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized> Clone for SeriesBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<S> SeriesBuilder<S>
where
    S: TransactionHistory + ?Sized,
{
    pub fn new(source: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    /// Series over `[today - lookback_days, today)`; needs at least one day
    /// with demand.
    pub fn build(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        lookback_days: u32,
    ) -> IntelligenceResult<DemandSeries> {
        self.build_for(product_id, branch_id, lookback_days, 1)
    }

    /// Like [`build`](Self::build), failing with `InsufficientData` when
    /// fewer than `minimum_nonzero` days carry demand.
    pub fn build_for(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        lookback_days: u32,
        minimum_nonzero: usize,
    ) -> IntelligenceResult<DemandSeries> {
        if lookback_days == 0 {
            return Err(IntelligenceError::invalid_input("lookback_days must be > 0"));
        }

        let today = self.clock.today();
        let since = today - Duration::days(i64::from(lookback_days));
        let history = self
            .source
            .transaction_history(product_id, branch_id, since)?;

        let mut buckets: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        let mut ignored = 0usize;
        for tx in &history {
            let day = tx.occurred_at.date_naive();
            if day < since || day >= today {
                ignored += 1;
                continue;
            }
            *buckets.entry(day).or_insert(Decimal::ZERO) += tx.quantity;
        }

        let mut points = Vec::with_capacity(lookback_days as usize);
        let mut day = since;
        while day < today {
            // Net returns exceeding sales on a day count as no demand.
            let quantity = buckets
                .get(&day)
                .copied()
                .unwrap_or(Decimal::ZERO)
                .max(Decimal::ZERO);
            points.push(DemandPoint {
                period_start: day,
                quantity,
            });
            day += Duration::days(1);
        }

        let series = DemandSeries::new(points)?;
        let nonzero = series.nonzero_periods();

        debug!(
            product = %product_id,
            branch = ?branch_id,
            lookback_days,
            transactions = history.len(),
            ignored,
            nonzero,
            "built demand series"
        );

        if nonzero < minimum_nonzero {
            return Err(IntelligenceError::insufficient(minimum_nonzero, nonzero));
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::clock::FixedClock;
    use crate::source::{SourceError, Transaction};

    struct FakeHistory {
        txs: Vec<Transaction>,
        seen_since: Mutex<Option<NaiveDate>>,
    }

    impl TransactionHistory for FakeHistory {
        fn transaction_history(
            &self,
            _product_id: ProductId,
            _branch_id: Option<BranchId>,
            since: NaiveDate,
        ) -> Result<Vec<Transaction>, SourceError> {
            *self.seen_since.lock().unwrap() = Some(since);
            Ok(self.txs.clone())
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn tx(d: u32, hour: u32, qty: Decimal) -> Transaction {
        Transaction::new(Utc.with_ymd_and_hms(2024, 3, d, hour, 0, 0).unwrap(), qty)
    }

    fn builder(txs: Vec<Transaction>) -> (SeriesBuilder<FakeHistory>, Arc<FakeHistory>) {
        let source = Arc::new(FakeHistory {
            txs,
            seen_since: Mutex::new(None),
        });
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(day(11)));
        (SeriesBuilder::new(source.clone(), clock), source)
    }

    #[test]
    fn buckets_by_day_and_fills_gaps_with_zero() {
        let (b, source) = builder(vec![
            tx(1, 9, dec!(2)),
            tx(1, 15, dec!(3)),
            tx(4, 10, dec!(7)),
            tx(10, 23, dec!(1.5)),
        ]);

        let series = b.build(ProductId::new(), None, 10).unwrap();

        assert_eq!(*source.seen_since.lock().unwrap(), Some(day(1)));
        assert_eq!(series.len(), 10);
        assert_eq!(series.first_period(), Some(day(1)));
        assert_eq!(series.last_period(), Some(day(10)));
        let qty: Vec<Decimal> = series.points().iter().map(|p| p.quantity).collect();
        assert_eq!(
            qty,
            vec![
                dec!(5),
                dec!(0),
                dec!(0),
                dec!(7),
                dec!(0),
                dec!(0),
                dec!(0),
                dec!(0),
                dec!(0),
                dec!(1.5)
            ]
        );
        assert_eq!(series.nonzero_periods(), 3);
    }

    #[test]
    fn excludes_today_and_earlier_than_window() {
        let (b, _) = builder(vec![tx(11, 8, dec!(100)), tx(3, 8, dec!(4)), tx(5, 8, dec!(1))]);
        let series = b.build(ProductId::new(), None, 7).unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series.first_period(), Some(day(4)));
        assert_eq!(series.values().iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn negative_net_days_clamp_to_zero() {
        let (b, _) = builder(vec![tx(9, 8, dec!(2)), tx(9, 9, dec!(-5)), tx(10, 9, dec!(1))]);
        let series = b.build(ProductId::new(), None, 3).unwrap();
        let qty: Vec<Decimal> = series.points().iter().map(|p| p.quantity).collect();
        assert_eq!(qty, vec![dec!(0), dec!(0), dec!(1)]);
    }

    #[test]
    fn fails_with_insufficient_data_below_minimum_nonzero_days() {
        let (b, _) = builder(vec![tx(8, 8, dec!(2)), tx(9, 8, dec!(2))]);
        let err = b.build_for(ProductId::new(), None, 10, 7).unwrap_err();
        assert_eq!(err, IntelligenceError::insufficient(7, 2));
        assert_eq!(err.missing_periods(), Some(5));
    }

    #[test]
    fn no_history_at_all_is_insufficient() {
        let (b, _) = builder(vec![]);
        let err = b.build(ProductId::new(), None, 30).unwrap_err();
        assert_eq!(err, IntelligenceError::insufficient(1, 0));
    }

    #[test]
    fn zero_lookback_is_invalid_input() {
        let (b, _) = builder(vec![]);
        let err = b.build(ProductId::new(), None, 0).unwrap_err();
        assert!(matches!(err, IntelligenceError::InvalidInput(_)));
    }

    #[test]
    fn series_rejects_gaps_and_negatives() {
        let gap = vec![
            DemandPoint {
                period_start: day(1),
                quantity: dec!(1),
            },
            DemandPoint {
                period_start: day(3),
                quantity: dec!(1),
            },
        ];
        assert!(DemandSeries::new(gap).is_err());
        assert!(DemandSeries::from_daily(day(1), &[dec!(1), dec!(-1)]).is_err());
        assert!(DemandSeries::from_daily(day(1), &[dec!(1), dec!(0)]).is_ok());
    }
}
