//! `InventorySource` implementations.

pub mod in_memory;

#[cfg(feature = "postgres")]
pub mod postgres;
