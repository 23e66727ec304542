//! Infrastructure layer: collaborator adapters behind the intelligence traits.
//!
//! - `source::in_memory`: process-local ledger and catalog for tests/dev.
//! - `source::postgres` (feature `postgres`): read-only queries against the
//!   back-office database.

pub mod source;

pub use source::in_memory::{InMemoryInventorySource, ProductSettings};
#[cfg(feature = "postgres")]
pub use source::postgres::PostgresInventorySource;
