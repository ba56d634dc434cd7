//! Money checks and total recalculation
//!
//! All monetary arithmetic runs on `rust_decimal::Decimal` rounded to 2
//! decimal places half-up (NUMERIC(12,2) semantics). The order total is
//! always recomputed as the full sum over the order's current items,
//! never maintained with incremental deltas, so a partially failed
//! concurrent edit can at worst leave a total that the next
//! recalculation fully repairs.

use crate::orders::OrderError;
use crate::storage::{Storage, StorageResult};
use redb::WriteTransaction;
use rust_decimal::prelude::*;
use shared::order::{ItemChanges, OrderItemInput};

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Largest representable amount, as a scale-2 mantissa (NUMERIC(12,2))
const MAX_AMOUNT_MANTISSA: i64 = 999_999_999_999; // 9_999_999_999.99

/// Round a monetary value to storage precision
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

fn check_amount(value: Decimal, field_name: &str) -> Result<(), OrderError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(OrderError::InvalidAmount(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    let max_amount = Decimal::new(MAX_AMOUNT_MANTISSA, DECIMAL_PLACES);
    if value > max_amount {
        return Err(OrderError::InvalidAmount(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, max_amount, value
        )));
    }
    Ok(())
}

/// Validate an OrderItemInput before processing
pub fn validate_item_input(item: &OrderItemInput) -> Result<(), OrderError> {
    if item.quantity <= 0 {
        return Err(OrderError::InvalidQuantity(item.quantity));
    }
    check_amount(item.price, "price")?;
    check_amount(item.total_price, "total_price")?;
    Ok(())
}

/// Validate item changes (from the update-item operation)
pub fn validate_item_changes(changes: &ItemChanges) -> Result<(), OrderError> {
    if let Some(quantity) = changes.quantity
        && quantity <= 0
    {
        return Err(OrderError::InvalidQuantity(quantity));
    }
    if let Some(price) = changes.price {
        check_amount(price, "price")?;
    }
    if let Some(total_price) = changes.total_price {
        check_amount(total_price, "total_price")?;
    }
    Ok(())
}

/// Recalculate an order's total from its current items (within transaction)
///
/// Runs after every item mutation, inside the mutating transaction, so the
/// written total reflects exactly the item set visible at this point. The
/// sum is written unconditionally; an empty item set yields zero. A
/// vanished order is a benign no-op, never an error.
pub fn recalculate_total(
    storage: &Storage,
    txn: &WriteTransaction,
    order_id: i64,
) -> StorageResult<()> {
    use crate::audit::Touch;

    let Some(mut order) = storage.get_order_txn(txn, order_id)? else {
        tracing::debug!(order_id, "Recalculation skipped, order no longer exists");
        return Ok(());
    };

    let items = storage.items_for_order_txn(txn, order_id)?;
    let sum: Decimal = items.iter().map(|item| item.total_price).sum();
    order.total_amount = round_money(sum);
    order.touch();
    storage.put_order(txn, &order)?;

    tracing::debug!(
        order_id,
        items = items.len(),
        total = %order.total_amount,
        "Order total recalculated"
    );
    Ok(())
}
