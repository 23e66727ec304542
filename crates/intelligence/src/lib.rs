//! `microfin-intelligence`
//!
//! **Responsibility:** inventory intelligence for branch stock.
//!
//! Leaves first:
//! - [`series`]: raw transactions -> contiguous daily demand series
//! - [`forecast`]: closed set of forecasting strategies over a series
//! - [`reorder`]: lead-time demand, safety stock and reorder point
//! - [`recommend`]: ranked replenishment actions across many products/branches
//!
//! This crate does not own persistence. History and product metadata are read
//! through the traits in [`source`], injected at construction.

pub mod cache;
pub mod clock;
pub mod config;
pub mod decimal;
pub mod error;
pub mod forecast;
pub mod pool;
pub mod recommend;
pub mod reorder;
pub mod series;
pub mod service;
pub mod source;
pub mod stats;

pub use cache::ForecastCache;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, IntelligenceConfig};
pub use error::{IntelligenceError, IntelligenceResult};
pub use forecast::{ArimaOrder, ForecastEngine, ForecastMethod, ForecastResult};
pub use recommend::{
    FailedItem, InsufficientItem, Page, Recommendation, RecommendationEngine, RecommendationReport,
    Urgency,
};
pub use reorder::{ReorderPointCalculator, ReorderPointResult};
pub use series::{DemandPoint, DemandSeries, SeriesBuilder};
pub use service::InventoryIntelligence;
pub use source::{InventorySource, ProductCatalog, ProductMetadata, SourceError, Transaction, TransactionHistory};
