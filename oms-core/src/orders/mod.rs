//! Orders manager - order numbering and derived totals
//!
//! Owns the two derived fields of an order: `order_number` (allocated
//! exactly once at creation when the caller supplies none) and
//! `total_amount` (recomputed from the full item set after every item
//! mutation). Every operation runs in one write transaction; the item
//! mutation and the recalculation it triggers commit or roll back
//! together.
//!
//! # Operation Flow
//!
//! ```text
//! create_order(input)
//!     ├─ 1. Validate items
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Allocate order number (scan) unless supplied
//!     ├─ 4. Claim number in unique index ── occupied → DuplicateOrderNumber
//!     ├─ 5. Insert order + item rows
//!     ├─ 6. Recalculate total (once for the batch)
//!     └─ 7. Commit
//! ```
//!
//! `DuplicateOrderNumber` is the one retryable failure: the engine never
//! retries internally, callers re-invoke the operation in a fresh attempt.

pub mod money;
pub mod numbering;

use crate::storage::{Storage, StorageError};
use rust_decimal::Decimal;
use shared::error::ErrorCode;
use shared::order::{
    ItemChanges, Order, OrderCreate, OrderItem, OrderItemInput, OrderStats, OrderStatus,
};
use shared::util::now_millis;
use thiserror::Error;
use uuid::Uuid;

/// Order manager errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Allocation collision; retry the operation in a fresh attempt
    #[error("Order number already taken: {0}")]
    DuplicateOrderNumber(String),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Item not found: order {order_id}, nomenclature {nomenclature_id}")]
    ItemNotFound { order_id: i64, nomenclature_id: i64 },

    #[error("Order {order_id} already has an item for nomenclature {nomenclature_id}")]
    DuplicateItem { order_id: i64, nomenclature_id: i64 },

    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl OrderError {
    /// Stable classification for the embedding service layer
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Storage(_) => ErrorCode::Storage,
            Self::DuplicateOrderNumber(_) => ErrorCode::RetryableConflict,
            Self::OrderNotFound(_) | Self::ItemNotFound { .. } => ErrorCode::NotFound,
            Self::DuplicateItem { .. } => ErrorCode::Conflict,
            Self::InvalidQuantity(_) | Self::InvalidAmount(_) => ErrorCode::Validation,
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

/// Orders manager
#[derive(Debug, Clone)]
pub struct OrdersManager {
    storage: Storage,
}

impl OrdersManager {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Create an order, allocating a number when none is supplied
    ///
    /// Items are inserted as one batch observed by a single
    /// recalculation. On `DuplicateOrderNumber` nothing is committed and
    /// the caller retries in a fresh attempt.
    pub fn create_order(&self, input: OrderCreate) -> OrderResult<Order> {
        for item in &input.items {
            money::validate_item_input(item)?;
        }

        let txn = self.storage.begin_write()?;
        let order = {
            let id = self.storage.next_id(&txn, "order")?;
            let order_number = match &input.order_number {
                Some(number) => number.clone(),
                None => {
                    let claimed = self.storage.order_numbers_txn(&txn)?;
                    numbering::next_number(claimed.iter().map(String::as_str))
                }
            };
            self.storage
                .claim_order_number(&txn, &order_number, id)
                .map_err(|e| match e {
                    StorageError::DuplicateOrderNumber(n) => {
                        tracing::warn!(order_number = %n, "Order number collision");
                        OrderError::DuplicateOrderNumber(n)
                    }
                    other => OrderError::Storage(other),
                })?;

            let now = now_millis();
            let order = Order {
                id,
                uuid: Uuid::new_v4(),
                order_number,
                order_date: input.order_date.unwrap_or(now),
                total_amount: Decimal::ZERO,
                status: input.status,
                payment_status: input.payment_status,
                notes: input.notes.clone(),
                created_at: now,
                updated_at: now,
            };
            self.storage.put_order(&txn, &order)?;

            for item in &input.items {
                self.insert_item_row(&txn, id, item)?;
            }
            money::recalculate_total(&self.storage, &txn, id)?;

            self.storage
                .get_order_txn(&txn, id)?
                .ok_or(OrderError::OrderNotFound(id))?
        };
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            "Order created"
        );
        Ok(order)
    }

    /// Add one line to an existing order and recalculate its total
    pub fn add_item(&self, order_id: i64, input: OrderItemInput) -> OrderResult<OrderItem> {
        money::validate_item_input(&input)?;

        let txn = self.storage.begin_write()?;
        let item = {
            if self.storage.get_order_txn(&txn, order_id)?.is_none() {
                return Err(OrderError::OrderNotFound(order_id));
            }
            let item = self.insert_item_row(&txn, order_id, &input)?;
            money::recalculate_total(&self.storage, &txn, order_id)?;
            item
        };
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(
            order_id,
            nomenclature_id = item.nomenclature_id,
            "Order item added"
        );
        Ok(item)
    }

    /// Update an existing line and recalculate the order total
    pub fn update_item(
        &self,
        order_id: i64,
        nomenclature_id: i64,
        changes: ItemChanges,
    ) -> OrderResult<OrderItem> {
        money::validate_item_changes(&changes)?;

        let txn = self.storage.begin_write()?;
        let item = {
            let mut item = self
                .storage
                .find_item_by_nomenclature(&txn, order_id, nomenclature_id)?
                .ok_or(OrderError::ItemNotFound {
                    order_id,
                    nomenclature_id,
                })?;

            if let Some(quantity) = changes.quantity {
                item.quantity = quantity;
            }
            if let Some(price) = changes.price {
                item.price = price;
            }
            if let Some(total_price) = changes.total_price {
                item.total_price = total_price;
            }
            self.storage.put_item(&txn, &item)?;
            money::recalculate_total(&self.storage, &txn, order_id)?;
            item
        };
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(order_id, nomenclature_id, "Order item updated");
        Ok(item)
    }

    /// Remove a line and recalculate the order total
    pub fn remove_item(&self, order_id: i64, nomenclature_id: i64) -> OrderResult<()> {
        let txn = self.storage.begin_write()?;
        {
            let item = self
                .storage
                .find_item_by_nomenclature(&txn, order_id, nomenclature_id)?
                .ok_or(OrderError::ItemNotFound {
                    order_id,
                    nomenclature_id,
                })?;
            self.storage.remove_item(&txn, order_id, item.id)?;
            money::recalculate_total(&self.storage, &txn, order_id)?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(order_id, nomenclature_id, "Order item removed");
        Ok(())
    }

    /// Delete an order and its items
    ///
    /// The order's number stays claimed: numbers are never reissued.
    pub fn delete_order(&self, order_id: i64) -> OrderResult<()> {
        let txn = self.storage.begin_write()?;
        {
            if self.storage.get_order_txn(&txn, order_id)?.is_none() {
                return Err(OrderError::OrderNotFound(order_id));
            }
            self.storage.remove_order(&txn, order_id)?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id, "Order deleted");
        Ok(())
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: i64) -> OrderResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Items of an order
    pub fn get_order_items(&self, order_id: i64) -> OrderResult<Vec<OrderItem>> {
        Ok(self.storage.items_for_order(order_id)?)
    }

    /// Compute the next order number from a read snapshot, without
    /// claiming it
    ///
    /// Two callers that peek before either commits will see the same
    /// number; exactly one of their writes survives the unique index, the
    /// other receives `DuplicateOrderNumber` and must retry.
    pub fn peek_next_order_number(&self) -> OrderResult<String> {
        let claimed = self.storage.order_numbers()?;
        Ok(numbering::next_number(claimed.iter().map(String::as_str)))
    }

    /// Aggregate order statistics, excluding cancelled orders
    pub fn stats(&self) -> OrderResult<OrderStats> {
        let orders = self.storage.orders()?;

        let mut total_orders = 0_u64;
        let mut total_amount = Decimal::ZERO;
        let mut pending_orders = 0_u64;
        let mut completed_orders = 0_u64;
        for order in &orders {
            if order.status == OrderStatus::Cancelled {
                continue;
            }
            total_orders += 1;
            total_amount += order.total_amount;
            match order.status {
                OrderStatus::Pending => pending_orders += 1,
                OrderStatus::Completed => completed_orders += 1,
                _ => {}
            }
        }

        let avg_order = if total_orders > 0 {
            money::round_money(total_amount / Decimal::from(total_orders))
        } else {
            Decimal::ZERO
        };

        Ok(OrderStats {
            total_orders,
            total_amount,
            avg_order,
            pending_orders,
            completed_orders,
        })
    }

    /// Insert one item row, enforcing the `(order_id, nomenclature_id)`
    /// uniqueness constraint (within transaction)
    fn insert_item_row(
        &self,
        txn: &redb::WriteTransaction,
        order_id: i64,
        input: &OrderItemInput,
    ) -> OrderResult<OrderItem> {
        if self
            .storage
            .find_item_by_nomenclature(txn, order_id, input.nomenclature_id)?
            .is_some()
        {
            return Err(OrderError::DuplicateItem {
                order_id,
                nomenclature_id: input.nomenclature_id,
            });
        }

        let item = OrderItem {
            id: self.storage.next_id(txn, "order_item")?,
            uuid: Uuid::new_v4(),
            order_id,
            nomenclature_id: input.nomenclature_id,
            quantity: input.quantity,
            price: input.price,
            total_price: input.total_price,
            created_at: now_millis(),
        };
        self.storage.put_item(txn, &item)?;
        Ok(item)
    }
}
