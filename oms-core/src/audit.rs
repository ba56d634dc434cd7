//! Audit stamping for mutated rows
//!
//! Every manager sets `updated_at` through this trait right before
//! persisting a row. Idempotent; carries no other state.

use shared::catalog::Category;
use shared::order::Order;
use shared::util::now_millis;

/// Stamp the last-modified timestamp on a mutated row
pub trait Touch {
    fn touch(&mut self);
}

impl Touch for Category {
    fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}

impl Touch for Order {
    fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::{OrderStatus, PaymentStatus};
    use uuid::Uuid;

    #[test]
    fn touch_moves_updated_at_forward() {
        let mut order = Order {
            id: 1,
            uuid: Uuid::new_v4(),
            order_number: "ORD-000001".to_string(),
            order_date: 0,
            total_amount: Decimal::ZERO,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            notes: None,
            created_at: 0,
            updated_at: 0,
        };

        order.touch();
        assert!(order.updated_at > 0);
        assert_eq!(order.created_at, 0);
    }
}
