//! `microfin-core`: shared domain primitives (ids, identifier errors).
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{BranchId, ProductId};
