//! Read-only collaborator interfaces.
//!
//! The core never owns persistence: the transaction ledger and the product
//! catalog are injected behind these traits (in-memory for tests/dev,
//! Postgres in deployment).

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use microfin_core::{BranchId, ProductId};

/// One outbound stock movement (sale, issue, disbursement in kind).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub occurred_at: DateTime<Utc>,
    pub quantity: Decimal,
}

impl Transaction {
    pub fn new(occurred_at: DateTime<Utc>, quantity: Decimal) -> Self {
        Self {
            occurred_at,
            quantity,
        }
    }
}

/// Stock and ordering parameters for a product, at a branch or globally.
///
/// With `branch_id == None` the collaborator reports totals across branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub product_id: ProductId,
    pub branch_id: Option<BranchId>,
    pub current_stock: Decimal,
    pub unit_cost: Decimal,
    /// Configured supplier lead time.
    pub lead_time_days: u32,
    /// Standard deviation of the lead time in days, when the supplier's
    /// delivery history is tracked.
    pub lead_time_std_days: Option<Decimal>,
    pub minimum_order_quantity: Decimal,
    /// Orders are placed in multiples of this quantity, when set.
    pub order_unit: Option<Decimal>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Historical outbound transactions.
pub trait TransactionHistory: Send + Sync {
    /// Transactions for `product_id` at or after `since` (UTC midnight).
    /// `branch_id == None` means all branches.
    fn transaction_history(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>, SourceError>;
}

/// Product/branch metadata lookup.
pub trait ProductCatalog: Send + Sync {
    /// Fails with `SourceError::NotFound` for an unknown product or branch.
    fn product_metadata(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
    ) -> Result<ProductMetadata, SourceError>;

    /// Branches currently holding a positive stock of the product.
    fn branches_holding_stock(&self, product_id: ProductId) -> Result<Vec<BranchId>, SourceError>;

    /// All stocked products (default candidate set for recommendations).
    fn list_products(&self) -> Result<Vec<ProductId>, SourceError>;
}

/// Everything the core reads.
pub trait InventorySource: TransactionHistory + ProductCatalog {}

impl<T> InventorySource for T where T: TransactionHistory + ProductCatalog + ?Sized {}

impl<S> TransactionHistory for Arc<S>
where
    S: TransactionHistory + ?Sized,
{
    fn transaction_history(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>, SourceError> {
        (**self).transaction_history(product_id, branch_id, since)
    }
}

impl<S> ProductCatalog for Arc<S>
where
    S: ProductCatalog + ?Sized,
{
    fn product_metadata(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
    ) -> Result<ProductMetadata, SourceError> {
        (**self).product_metadata(product_id, branch_id)
    }

    fn branches_holding_stock(&self, product_id: ProductId) -> Result<Vec<BranchId>, SourceError> {
        (**self).branches_holding_stock(product_id)
    }

    fn list_products(&self) -> Result<Vec<ProductId>, SourceError> {
        (**self).list_products()
    }
}
