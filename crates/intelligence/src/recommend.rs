//! Cross-branch replenishment recommendations.
//!
//! Every (product, branch) pair is evaluated independently on a bounded worker
//! pool. Pairs without enough history are reported in `insufficient_data`;
//! any other failure lands in `errors`. Neither cancels the rest of the batch.

use std::cmp::Ordering;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use microfin_core::{BranchId, ProductId};

use crate::clock::Clock;
use crate::config::IntelligenceConfig;
use crate::decimal::round;
use crate::error::{IntelligenceError, IntelligenceResult};
use crate::pool::run_bounded;
use crate::reorder::{ReorderPointCalculator, ReorderPointResult};
use crate::source::InventorySource;

/// Urgency tier; declaration order is ranking order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    /// Tier from the gap relative to the reorder point.
    ///
    /// `gap <= 0` is `Low`; otherwise `gap / max(reorder_point, ε)` maps
    /// `>= 0.5` to `Critical`, `>= 0.2` to `High` and the rest to `Medium`.
    pub fn classify(gap: Decimal, reorder_point: Decimal) -> Self {
        if gap <= Decimal::ZERO {
            return Urgency::Low;
        }
        let epsilon = Decimal::new(1, 6);
        let ratio = gap / reorder_point.max(epsilon);
        if ratio >= Decimal::new(5, 1) {
            Urgency::Critical
        } else if ratio >= Decimal::new(2, 1) {
            Urgency::High
        } else {
            Urgency::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub product_id: ProductId,
    /// `None` means all branches.
    pub branch_id: Option<BranchId>,
    pub current_stock: Decimal,
    pub reorder_point: Decimal,
    pub gap: Decimal,
    pub urgency: Urgency,
    /// 1-based position in the full ranking (before pagination).
    pub rank: usize,
    pub suggested_order_qty: Decimal,
    pub estimated_cost: Decimal,
}

/// Ranking comparator: urgency, then larger gap first, then ids.
pub fn rank_order(a: &Recommendation, b: &Recommendation) -> Ordering {
    a.urgency
        .cmp(&b.urgency)
        .then_with(|| b.gap.cmp(&a.gap))
        .then_with(|| a.product_id.cmp(&b.product_id))
        .then_with(|| a.branch_id.cmp(&b.branch_id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsufficientItem {
    pub product_id: ProductId,
    pub branch_id: Option<BranchId>,
    pub required_days: usize,
    pub available_days: usize,
    pub missing_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub product_id: ProductId,
    pub branch_id: Option<BranchId>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationReport {
    pub recommendations: Vec<Recommendation>,
    pub insufficient_data: Vec<InsufficientItem>,
    pub errors: Vec<FailedItem>,
    /// Ranked recommendations before pagination.
    pub total: usize,
}

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 500;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// Limit is clamped to `1..=MAX_PAGE_LIMIT`.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Everything, unpaginated.
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: usize::MAX,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

type Pair = (ProductId, Option<BranchId>);

pub struct RecommendationEngine<S: ?Sized> {
    source: Arc<S>,
    calculator: ReorderPointCalculator<S>,
    config: IntelligenceConfig,
}

impl<S> RecommendationEngine<S>
where
    S: InventorySource + ?Sized,
{
    pub fn new(source: Arc<S>, clock: Arc<dyn Clock>, config: IntelligenceConfig) -> Self {
        Self {
            calculator: ReorderPointCalculator::new(source.clone(), clock, config.clone()),
            source,
            config,
        }
    }

    /// Full ranking, unpaginated.
    pub fn recommend(
        &self,
        branch_id: Option<BranchId>,
        candidate_products: &[ProductId],
    ) -> RecommendationReport {
        self.recommend_page(branch_id, candidate_products, Page::all())
    }

    pub fn recommend_page(
        &self,
        branch_id: Option<BranchId>,
        candidate_products: &[ProductId],
        page: Page,
    ) -> RecommendationReport {
        let mut products = candidate_products.to_vec();
        products.sort();
        products.dedup();

        let mut errors = Vec::new();
        let pairs = self.work_set(branch_id, &products, &mut errors);

        let outcomes = run_bounded(&pairs, self.config.max_concurrency, |&(product_id, branch)| {
            self.evaluate(product_id, branch)
        });

        let mut ranked = Vec::new();
        let mut insufficient_data = Vec::new();
        for (&(product_id, branch), outcome) in pairs.iter().zip(outcomes) {
            match outcome {
                Ok(Ok(rec)) => ranked.push(rec),
                Ok(Err(IntelligenceError::InsufficientData {
                    required,
                    available,
                })) => insufficient_data.push(InsufficientItem {
                    product_id,
                    branch_id: branch,
                    required_days: required,
                    available_days: available,
                    missing_days: required.saturating_sub(available),
                }),
                Ok(Err(e)) => errors.push(FailedItem {
                    product_id,
                    branch_id: branch,
                    error: e.to_string(),
                }),
                Err(panic) => errors.push(FailedItem {
                    product_id,
                    branch_id: branch,
                    error: format!("evaluation aborted: {panic}"),
                }),
            }
        }

        ranked.sort_by(rank_order);
        for (i, rec) in ranked.iter_mut().enumerate() {
            rec.rank = i + 1;
        }
        errors.sort_by(|a, b| (a.product_id, a.branch_id).cmp(&(b.product_id, b.branch_id)));

        let total = ranked.len();
        info!(
            branch = ?branch_id,
            candidates = products.len(),
            pairs = pairs.len(),
            ranked = total,
            insufficient = insufficient_data.len(),
            failed = errors.len(),
            "recommendations computed"
        );

        let recommendations = ranked
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();

        RecommendationReport {
            recommendations,
            insufficient_data,
            errors,
            total,
        }
    }

    /// With a branch: each product there. Without: each product at every
    /// branch holding it, or globally when none does.
    fn work_set(
        &self,
        branch_id: Option<BranchId>,
        products: &[ProductId],
        errors: &mut Vec<FailedItem>,
    ) -> Vec<Pair> {
        if let Some(branch) = branch_id {
            return products.iter().map(|p| (*p, Some(branch))).collect();
        }

        let mut pairs = Vec::new();
        for &product_id in products {
            match self.source.branches_holding_stock(product_id) {
                Ok(branches) if branches.is_empty() => pairs.push((product_id, None)),
                Ok(mut branches) => {
                    branches.sort();
                    branches.dedup();
                    pairs.extend(branches.into_iter().map(|b| (product_id, Some(b))));
                }
                Err(e) => errors.push(FailedItem {
                    product_id,
                    branch_id: None,
                    error: IntelligenceError::from(e).to_string(),
                }),
            }
        }
        pairs
    }

    fn evaluate(&self, product_id: ProductId, branch_id: Option<BranchId>) -> IntelligenceResult<Recommendation> {
        let metadata = self.source.product_metadata(product_id, branch_id)?;
        let lead_time = self.calculator.validate_lead_time(i64::from(metadata.lead_time_days))?;

        let primary = self.config.default_method;
        let result: ReorderPointResult = match self
            .calculator
            .compute_from_metadata(&metadata, lead_time, primary)
        {
            Err(IntelligenceError::ModelFit(msg)) if self.config.fallback_method != primary => {
                warn!(
                    product = %product_id,
                    branch = ?branch_id,
                    method = %primary,
                    fallback = %self.config.fallback_method,
                    error = %msg,
                    "retrying reorder point with fallback method"
                );
                self.calculator
                    .compute_from_metadata(&metadata, lead_time, self.config.fallback_method)?
            }
            other => other?,
        };

        let gap = result.reorder_point - metadata.current_stock;
        Ok(Recommendation {
            product_id,
            branch_id,
            current_stock: metadata.current_stock,
            reorder_point: result.reorder_point,
            gap,
            urgency: Urgency::classify(gap, result.reorder_point),
            rank: 0,
            suggested_order_qty: result.suggested_order_qty,
            estimated_cost: round(result.suggested_order_qty * metadata.unit_cost),
        })
    }
}
