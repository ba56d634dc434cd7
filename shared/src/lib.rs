//! Shared domain types for the order-management backend
//!
//! Plain data: category, order, and order-item records plus their input
//! structs, status enums, stable error codes, and small utilities. All
//! storage and business logic lives in `oms-core`.

pub mod catalog;
pub mod error;
pub mod order;
pub mod util;

// Re-exports
pub use catalog::{Category, CategoryCreate, CategoryTreeNode};
pub use error::ErrorCode;
pub use order::{
    ItemChanges, Order, OrderCreate, OrderItem, OrderItemInput, OrderStats, OrderStatus,
    PaymentStatus,
};
pub use serde::{Deserialize, Serialize};
