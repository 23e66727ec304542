use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use microfin_core::{BranchId, ProductId};
use microfin_intelligence::{
    ProductCatalog, ProductMetadata, SourceError, Transaction, TransactionHistory,
};

/// Ordering parameters of a product, shared by every branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSettings {
    pub unit_cost: Decimal,
    pub lead_time_days: u32,
    #[serde(default)]
    pub lead_time_std_days: Option<Decimal>,
    #[serde(default)]
    pub minimum_order_quantity: Decimal,
    #[serde(default)]
    pub order_unit: Option<Decimal>,
}

impl ProductSettings {
    pub fn new(unit_cost: Decimal, lead_time_days: u32) -> Self {
        Self {
            unit_cost,
            lead_time_days,
            lead_time_std_days: None,
            minimum_order_quantity: Decimal::ZERO,
            order_unit: None,
        }
    }

    pub fn with_lead_time_std_days(mut self, std_days: Decimal) -> Self {
        self.lead_time_std_days = Some(std_days);
        self
    }

    pub fn with_minimum_order_quantity(mut self, qty: Decimal) -> Self {
        self.minimum_order_quantity = qty;
        self
    }

    pub fn with_order_unit(mut self, unit: Decimal) -> Self {
        self.order_unit = Some(unit);
        self
    }
}

#[derive(Debug, Clone)]
struct Movement {
    branch_id: BranchId,
    occurred_at: DateTime<Utc>,
    quantity: Decimal,
}

#[derive(Debug, Default)]
struct ProductRecord {
    settings: Option<ProductSettings>,
    stock: HashMap<BranchId, Decimal>,
    movements: Vec<Movement>,
}

#[derive(Debug, Default)]
struct State {
    branches: BTreeSet<BranchId>,
    products: HashMap<ProductId, ProductRecord>,
}

/// In-memory ledger and catalog for tests/dev.
///
/// Global metadata (`branch_id == None`) reports stock summed over branches.
/// Stock for a known branch that never received the product is zero.
#[derive(Debug, Default)]
pub struct InMemoryInventorySource {
    inner: RwLock<State>,
}

fn poisoned<T>(_: T) -> SourceError {
    SourceError::Unavailable("in-memory inventory lock poisoned".to_string())
}

impl InMemoryInventorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes after a panic mid-write are dropped; reads already report
    /// the source as unavailable.
    fn write(&self, operation: &'static str) -> Option<RwLockWriteGuard<'_, State>> {
        match self.inner.write() {
            Ok(state) => Some(state),
            Err(_) => {
                warn!(operation, "in-memory inventory lock poisoned; write dropped");
                None
            }
        }
    }

    pub fn add_branch(&self, branch_id: BranchId) {
        if let Some(mut state) = self.write("add_branch") {
            state.branches.insert(branch_id);
        }
    }

    /// Registers a product, or replaces its settings.
    pub fn upsert_product(&self, product_id: ProductId, settings: ProductSettings) {
        if let Some(mut state) = self.write("upsert_product") {
            state.products.entry(product_id).or_default().settings = Some(settings);
        }
    }

    /// Sets on-hand stock of a product at a branch (registering the branch).
    pub fn set_stock(&self, product_id: ProductId, branch_id: BranchId, quantity: Decimal) {
        if let Some(mut state) = self.write("set_stock") {
            state.branches.insert(branch_id);
            state
                .products
                .entry(product_id)
                .or_default()
                .stock
                .insert(branch_id, quantity);
        }
    }

    /// Appends an outbound movement. Negative quantities model returns.
    pub fn record_outbound(
        &self,
        product_id: ProductId,
        branch_id: BranchId,
        occurred_at: DateTime<Utc>,
        quantity: Decimal,
    ) {
        if let Some(mut state) = self.write("record_outbound") {
            state.branches.insert(branch_id);
            state
                .products
                .entry(product_id)
                .or_default()
                .movements
                .push(Movement {
                    branch_id,
                    occurred_at,
                    quantity,
                });
        }
    }
}

fn known_product<'a>(state: &'a State, product_id: ProductId) -> Result<(&'a ProductRecord, &'a ProductSettings), SourceError> {
    state
        .products
        .get(&product_id)
        .and_then(|record| record.settings.as_ref().map(|s| (record, s)))
        .ok_or_else(|| SourceError::NotFound(format!("product {product_id}")))
}

fn known_branch(state: &State, branch_id: BranchId) -> Result<(), SourceError> {
    if state.branches.contains(&branch_id) {
        Ok(())
    } else {
        Err(SourceError::NotFound(format!("branch {branch_id}")))
    }
}

impl TransactionHistory for InMemoryInventorySource {
    fn transaction_history(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>, SourceError> {
        let state = self.inner.read().map_err(poisoned)?;
        let (record, _) = known_product(&state, product_id)?;
        if let Some(branch) = branch_id {
            known_branch(&state, branch)?;
        }

        let mut out: Vec<Transaction> = record
            .movements
            .iter()
            .filter(|m| branch_id.is_none_or(|b| m.branch_id == b))
            .filter(|m| m.occurred_at.date_naive() >= since)
            .map(|m| Transaction::new(m.occurred_at, m.quantity))
            .collect();
        out.sort_by_key(|t| t.occurred_at);
        Ok(out)
    }
}

impl ProductCatalog for InMemoryInventorySource {
    fn product_metadata(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
    ) -> Result<ProductMetadata, SourceError> {
        let state = self.inner.read().map_err(poisoned)?;
        let (record, settings) = known_product(&state, product_id)?;

        let current_stock = match branch_id {
            Some(branch) => {
                known_branch(&state, branch)?;
                record.stock.get(&branch).copied().unwrap_or(Decimal::ZERO)
            }
            None => record.stock.values().copied().sum(),
        };

        Ok(ProductMetadata {
            product_id,
            branch_id,
            current_stock,
            unit_cost: settings.unit_cost,
            lead_time_days: settings.lead_time_days,
            lead_time_std_days: settings.lead_time_std_days,
            minimum_order_quantity: settings.minimum_order_quantity,
            order_unit: settings.order_unit,
        })
    }

    fn branches_holding_stock(&self, product_id: ProductId) -> Result<Vec<BranchId>, SourceError> {
        let state = self.inner.read().map_err(poisoned)?;
        let (record, _) = known_product(&state, product_id)?;
        let mut branches: Vec<BranchId> = record
            .stock
            .iter()
            .filter(|(_, qty)| **qty > Decimal::ZERO)
            .map(|(branch, _)| *branch)
            .collect();
        branches.sort();
        Ok(branches)
    }

    fn list_products(&self) -> Result<Vec<ProductId>, SourceError> {
        let state = self.inner.read().map_err(poisoned)?;
        let mut products: Vec<ProductId> = state
            .products
            .iter()
            .filter(|(_, record)| record.settings.is_some())
            .map(|(id, _)| *id)
            .collect();
        products.sort();
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;

    fn product(n: u128) -> ProductId {
        ProductId::from_uuid(Uuid::from_u128(n))
    }

    fn branch(n: u128) -> BranchId {
        BranchId::from_uuid(Uuid::from_u128(n))
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 10, 0, 0).unwrap()
    }

    fn seeded() -> InMemoryInventorySource {
        let source = InMemoryInventorySource::new();
        source.upsert_product(product(1), ProductSettings::new(dec!(2.5), 7));
        source.set_stock(product(1), branch(1), dec!(10));
        source.set_stock(product(1), branch(2), dec!(4));
        source.set_stock(product(1), branch(3), dec!(0));
        source.record_outbound(product(1), branch(1), at(3), dec!(2));
        source.record_outbound(product(1), branch(2), at(1), dec!(5));
        source.record_outbound(product(1), branch(1), at(20), dec!(1));
        source
    }

    #[test]
    fn global_metadata_sums_branch_stock() {
        let source = seeded();
        let meta = source.product_metadata(product(1), None).unwrap();
        assert_eq!(meta.current_stock, dec!(14));
        assert_eq!(meta.branch_id, None);
        assert_eq!(meta.lead_time_days, 7);

        let meta = source.product_metadata(product(1), Some(branch(2))).unwrap();
        assert_eq!(meta.current_stock, dec!(4));
    }

    #[test]
    fn known_branch_without_stock_reports_zero() {
        let source = seeded();
        source.add_branch(branch(9));
        let meta = source.product_metadata(product(1), Some(branch(9))).unwrap();
        assert_eq!(meta.current_stock, Decimal::ZERO);
    }

    #[test]
    fn unknown_product_or_branch_is_not_found() {
        let source = seeded();
        assert!(matches!(
            source.product_metadata(product(7), None),
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source.product_metadata(product(1), Some(branch(42))),
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source.transaction_history(product(7), None, at(1).date_naive()),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn history_filters_by_branch_and_since_in_time_order() {
        let source = seeded();
        let all = source
            .transaction_history(product(1), None, at(1).date_naive())
            .unwrap();
        let times: Vec<_> = all.iter().map(|t| t.occurred_at).collect();
        assert_eq!(times, vec![at(1), at(3), at(20)]);

        let b1 = source
            .transaction_history(product(1), Some(branch(1)), at(2).date_naive())
            .unwrap();
        assert_eq!(b1.len(), 2);

        let recent = source
            .transaction_history(product(1), None, at(10).date_naive())
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].quantity, dec!(1));
    }

    #[test]
    fn branches_holding_stock_excludes_empty_branches() {
        let source = seeded();
        assert_eq!(
            source.branches_holding_stock(product(1)).unwrap(),
            vec![branch(1), branch(2)]
        );
    }

    #[test]
    fn poisoned_lock_drops_writes_and_fails_reads() {
        let source = std::sync::Arc::new(seeded());
        let writer = std::sync::Arc::clone(&source);
        let panicked = std::thread::spawn(move || {
            let _guard = writer.inner.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(panicked.is_err());

        source.set_stock(product(1), branch(1), dec!(99));
        source.record_outbound(product(1), branch(1), at(21), dec!(1));
        source.add_branch(branch(8));
        source.upsert_product(product(2), ProductSettings::new(dec!(1), 3));

        assert!(matches!(
            source.product_metadata(product(1), Some(branch(1))),
            Err(SourceError::Unavailable(_))
        ));
        assert!(matches!(source.list_products(), Err(SourceError::Unavailable(_))));
        let state = source.inner.read().unwrap_or_else(|e| e.into_inner());
        assert_eq!(state.products[&product(1)].stock[&branch(1)], dec!(10));
        assert!(!state.branches.contains(&branch(8)));
    }

    #[test]
    fn stock_without_settings_is_not_a_listed_product() {
        let source = seeded();
        source.set_stock(product(5), branch(1), dec!(3));
        assert_eq!(source.list_products().unwrap(), vec![product(1)]);
    }
}
