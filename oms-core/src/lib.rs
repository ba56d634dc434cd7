//! Derived-state engine for the order-management backend
//!
//! Three pieces of denormalized data are kept consistent as the underlying
//! rows change, each inside the transaction that triggered the change:
//!
//! - **catalog**: a category's materialized `path`/`depth`, derived from
//!   its parent chain at write time
//! - **orders / numbering**: the unique `ORD-`-prefixed order number,
//!   allocated once at creation against a unique index
//! - **orders / money**: the order total, recomputed as the full sum of
//!   its items after every item mutation
//!
//! # Architecture
//!
//! ```text
//! Operation → Manager → WriteTransaction → Storage (redb)
//!                 │                            │
//!          derive + validate             single writer,
//!          inside the txn                all-or-nothing commit
//! ```
//!
//! Managers are thin handles over a shared [`Storage`]; every operation
//! opens one write transaction, performs the triggering write and the
//! derived writes through it, and commits. There is no background work: a
//! rolled-back transaction takes all derived writes with it.

pub mod audit;
pub mod catalog;
pub mod config;
pub mod orders;
pub mod storage;

// Re-exports
pub use audit::Touch;
pub use catalog::{CatalogError, CatalogManager, CatalogResult};
pub use config::Config;
pub use orders::{OrderError, OrderResult, OrdersManager};
pub use storage::{Storage, StorageError, StorageResult, StorageStats};

// Re-export shared types for convenience
pub use shared::catalog::{Category, CategoryCreate, CategoryTreeNode};
pub use shared::error::ErrorCode;
pub use shared::order::{
    ItemChanges, Order, OrderCreate, OrderItem, OrderItemInput, OrderStats, OrderStatus,
    PaymentStatus,
};
