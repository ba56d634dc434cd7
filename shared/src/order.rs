//! Order and order-item models
//!
//! `Order.order_number` and `Order.total_amount` are derived fields owned
//! by the orders manager: the number is allocated exactly once at creation
//! and never reassigned, the total is recomputed from the full item set
//! after every item mutation. External callers never write either field.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Partial,
    Refunded,
}

/// Order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub uuid: Uuid,
    /// Globally unique, assigned once at creation (`ORD-` + 6 digits)
    pub order_number: String,
    pub order_date: i64,
    /// Derived: sum of item `total_price`, recomputed per item mutation
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order item record
///
/// `total_price` is supplied by the caller, not derived here; the engine
/// only validates and sums it. At most one item per
/// `(order_id, nomenclature_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub uuid: Uuid,
    pub order_id: i64,
    pub nomenclature_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub total_price: Decimal,
    pub created_at: i64,
}

/// Input for one order line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub nomenclature_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub total_price: Decimal,
}

/// Partial update for an existing order line (None fields are unchanged)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Decimal>,
}

/// Input for creating an order
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderCreate {
    /// Explicit number; allocated by the engine when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    /// Defaults to the transaction timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_date: Option<i64>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
}

/// Aggregate order statistics (cancelled orders excluded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: u64,
    pub total_amount: Decimal,
    pub avg_order: Decimal,
    pub pending_orders: u64,
    pub completed_orders: u64,
}
