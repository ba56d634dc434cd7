//! redb-based storage layer for catalog and order state
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `categories` | `id` | `Category` | category rows with materialized path |
//! | `orders` | `id` | `Order` | order rows with derived total |
//! | `order_numbers` | `order_number` | order `id` | unique index, rejects duplicate numbers |
//! | `order_items` | `(order_id, item_id)` | `OrderItem` | line items, range-scannable per order |
//! | `ids` | entity name | `i64` | per-entity autoincrement counters |
//!
//! All derived-state maintenance (tree placement, number allocation, total
//! recalculation) happens inside a single `WriteTransaction` passed
//! explicitly by the managers; commit is all-or-nothing, so a failed
//! operation rolls every derived write back with it.
//!
//! The `order_numbers` index is the last line of defense against duplicate
//! allocation: an insert against an occupied key fails with
//! [`StorageError::DuplicateOrderNumber`] instead of overwriting. Entries
//! are kept even after order deletion so numbers are never reissued.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::catalog::Category;
use shared::order::{Order, OrderItem};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Category rows: key = category id, value = JSON-serialized Category
const CATEGORIES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("categories");

/// Order rows: key = order id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Unique order-number index: key = order number, value = owning order id
const ORDER_NUMBERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("order_numbers");

/// Order items: key = (order id, item id), value = JSON-serialized OrderItem
const ORDER_ITEMS_TABLE: TableDefinition<(i64, i64), &[u8]> = TableDefinition::new("order_items");

/// Per-entity id counters: key = entity name, value = last issued id
const IDS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("ids");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order number already taken: {0}")]
    DuplicateOrderNumber(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Catalog and order storage backed by redb
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl Storage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns
    /// the state is persistent, and the file is always in a consistent
    /// state (copy-on-write with atomic root swap).
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (testing and ephemeral embedding)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = write_txn.open_table(IDS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    ///
    /// redb serializes writers: the returned transaction holds the single
    /// write slot until commit or drop, so every read made through it sees
    /// the latest committed state plus this transaction's own writes.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Id Counters ==========

    /// Allocate the next id for an entity (within transaction)
    pub fn next_id(&self, txn: &WriteTransaction, entity: &str) -> StorageResult<i64> {
        let mut table = txn.open_table(IDS_TABLE)?;
        let current = table.get(entity)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(entity, next)?;
        Ok(next)
    }

    // ========== Categories ==========

    /// Insert or overwrite a category row (within transaction)
    pub fn put_category(&self, txn: &WriteTransaction, category: &Category) -> StorageResult<()> {
        let mut table = txn.open_table(CATEGORIES_TABLE)?;
        let value = serde_json::to_vec(category)?;
        table.insert(category.id, value.as_slice())?;
        Ok(())
    }

    /// Get a category by id (within transaction)
    pub fn get_category_txn(
        &self,
        txn: &WriteTransaction,
        id: i64,
    ) -> StorageResult<Option<Category>> {
        let table = txn.open_table(CATEGORIES_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a category by id (read-only)
    pub fn get_category(&self, id: i64) -> StorageResult<Option<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All category rows (within transaction)
    pub fn categories_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<Category>> {
        let table = txn.open_table(CATEGORIES_TABLE)?;
        let mut categories = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            categories.push(serde_json::from_slice(value.value())?);
        }
        Ok(categories)
    }

    /// All category rows (read-only)
    pub fn categories(&self) -> StorageResult<Vec<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;
        let mut categories = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            categories.push(serde_json::from_slice(value.value())?);
        }
        Ok(categories)
    }

    /// Remove a category row (within transaction)
    pub fn remove_category(&self, txn: &WriteTransaction, id: i64) -> StorageResult<()> {
        let mut table = txn.open_table(CATEGORIES_TABLE)?;
        table.remove(id)?;
        Ok(())
    }

    // ========== Order Numbers ==========

    /// Claim an order number for an order (within transaction)
    ///
    /// Fails with [`StorageError::DuplicateOrderNumber`] when the number is
    /// already taken; the caller decides whether that is retryable.
    pub fn claim_order_number(
        &self,
        txn: &WriteTransaction,
        number: &str,
        order_id: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_NUMBERS_TABLE)?;
        if table.get(number)?.is_some() {
            return Err(StorageError::DuplicateOrderNumber(number.to_string()));
        }
        table.insert(number, order_id)?;
        Ok(())
    }

    /// All claimed order numbers (within transaction)
    pub fn order_numbers_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<String>> {
        let table = txn.open_table(ORDER_NUMBERS_TABLE)?;
        let mut numbers = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            numbers.push(key.value().to_string());
        }
        Ok(numbers)
    }

    /// All claimed order numbers (read-only snapshot)
    pub fn order_numbers(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_NUMBERS_TABLE)?;
        let mut numbers = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            numbers.push(key.value().to_string());
        }
        Ok(numbers)
    }

    // ========== Orders ==========

    /// Insert or overwrite an order row (within transaction)
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id, value.as_slice())?;
        Ok(())
    }

    /// Get an order by id (within transaction)
    pub fn get_order_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by id (read-only)
    pub fn get_order(&self, id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All order rows (read-only)
    pub fn orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    /// Remove an order and its items (within transaction)
    ///
    /// The `order_numbers` entry is deliberately left behind: numbers are
    /// never reissued, even when the order that held one is gone.
    pub fn remove_order(&self, txn: &WriteTransaction, id: i64) -> StorageResult<()> {
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            table.remove(id)?;
        }

        let mut items_table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut keys_to_remove: Vec<(i64, i64)> = Vec::new();
        for result in items_table.range((id, 0_i64)..=(id, i64::MAX))? {
            let (key, _value) = result?;
            keys_to_remove.push(key.value());
        }
        for key in &keys_to_remove {
            items_table.remove(key)?;
        }

        Ok(())
    }

    // ========== Order Items ==========

    /// Insert or overwrite an item row (within transaction)
    pub fn put_item(&self, txn: &WriteTransaction, item: &OrderItem) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let value = serde_json::to_vec(item)?;
        table.insert((item.order_id, item.id), value.as_slice())?;
        Ok(())
    }

    /// Remove an item row (within transaction)
    pub fn remove_item(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
        item_id: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        table.remove((order_id, item_id))?;
        Ok(())
    }

    /// All items for an order (within transaction)
    pub fn items_for_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Vec<OrderItem>> {
        let table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut items = Vec::new();
        for result in table.range((order_id, 0_i64)..=(order_id, i64::MAX))? {
            let (_key, value) = result?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    /// All items for an order (read-only)
    pub fn items_for_order(&self, order_id: i64) -> StorageResult<Vec<OrderItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS_TABLE)?;
        let mut items = Vec::new();
        for result in table.range((order_id, 0_i64)..=(order_id, i64::MAX))? {
            let (_key, value) = result?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    /// Find an order's item by nomenclature reference (within transaction)
    pub fn find_item_by_nomenclature(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
        nomenclature_id: i64,
    ) -> StorageResult<Option<OrderItem>> {
        let table = txn.open_table(ORDER_ITEMS_TABLE)?;
        for result in table.range((order_id, 0_i64)..=(order_id, i64::MAX))? {
            let (_key, value) = result?;
            let item: OrderItem = serde_json::from_slice(value.value())?;
            if item.nomenclature_id == nomenclature_id {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let categories_table = read_txn.open_table(CATEGORIES_TABLE)?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;
        let numbers_table = read_txn.open_table(ORDER_NUMBERS_TABLE)?;
        let items_table = read_txn.open_table(ORDER_ITEMS_TABLE)?;

        Ok(StorageStats {
            category_count: categories_table.len()?,
            order_count: orders_table.len()?,
            claimed_number_count: numbers_table.len()?,
            order_item_count: items_table.len()?,
        })
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub category_count: u64,
    pub order_count: u64,
    pub claimed_number_count: u64,
    pub order_item_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::{OrderStatus, PaymentStatus};
    use shared::util::now_millis;
    use uuid::Uuid;

    fn test_order(id: i64, number: &str) -> Order {
        let now = now_millis();
        Order {
            id,
            uuid: Uuid::new_v4(),
            order_number: number.to_string(),
            order_date: now,
            total_amount: Decimal::ZERO,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_item(order_id: i64, item_id: i64, nomenclature_id: i64) -> OrderItem {
        OrderItem {
            id: item_id,
            uuid: Uuid::new_v4(),
            order_id,
            nomenclature_id,
            quantity: 1,
            price: Decimal::new(1000, 2),
            total_price: Decimal::new(1000, 2),
            created_at: now_millis(),
        }
    }

    #[test]
    fn test_id_counters_are_independent() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_id(&txn, "order").unwrap(), 1);
        assert_eq!(storage.next_id(&txn, "order").unwrap(), 2);
        assert_eq!(storage.next_id(&txn, "category").unwrap(), 1);
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_id(&txn, "order").unwrap(), 3);
        txn.commit().unwrap();
    }

    #[test]
    fn test_claim_order_number_rejects_duplicate() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.claim_order_number(&txn, "ORD-000001", 1).unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        let err = storage
            .claim_order_number(&txn, "ORD-000001", 2)
            .unwrap_err();
        match err {
            StorageError::DuplicateOrderNumber(n) => assert_eq!(n, "ORD-000001"),
            other => panic!("Expected DuplicateOrderNumber, got {other:?}"),
        }
    }

    #[test]
    fn test_uncommitted_claim_rolls_back() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.claim_order_number(&txn, "ORD-000001", 1).unwrap();
        drop(txn); // abort

        assert!(storage.order_numbers().unwrap().is_empty());

        let txn = storage.begin_write().unwrap();
        storage.claim_order_number(&txn, "ORD-000001", 1).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn test_item_range_scan_is_per_order() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_item(&txn, &test_item(1, 1, 10)).unwrap();
        storage.put_item(&txn, &test_item(1, 2, 11)).unwrap();
        storage.put_item(&txn, &test_item(2, 3, 10)).unwrap();
        txn.commit().unwrap();

        let items = storage.items_for_order(1).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.order_id == 1));
    }

    #[test]
    fn test_remove_order_cascades_items_but_keeps_number() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &test_order(1, "ORD-000001")).unwrap();
        storage.claim_order_number(&txn, "ORD-000001", 1).unwrap();
        storage.put_item(&txn, &test_item(1, 1, 10)).unwrap();
        storage.put_item(&txn, &test_item(1, 2, 11)).unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.remove_order(&txn, 1).unwrap();
        txn.commit().unwrap();

        assert!(storage.get_order(1).unwrap().is_none());
        assert!(storage.items_for_order(1).unwrap().is_empty());
        // number tombstone survives deletion
        assert_eq!(storage.order_numbers().unwrap(), vec!["ORD-000001"]);
    }

    #[test]
    fn test_find_item_by_nomenclature() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_item(&txn, &test_item(1, 1, 10)).unwrap();
        storage.put_item(&txn, &test_item(1, 2, 11)).unwrap();

        let found = storage.find_item_by_nomenclature(&txn, 1, 11).unwrap();
        assert_eq!(found.map(|i| i.id), Some(2));

        let missing = storage.find_item_by_nomenclature(&txn, 1, 99).unwrap();
        assert!(missing.is_none());
        txn.commit().unwrap();
    }

    #[test]
    fn test_get_stats() {
        let storage = Storage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &test_order(1, "ORD-000001")).unwrap();
        storage.claim_order_number(&txn, "ORD-000001", 1).unwrap();
        storage.put_item(&txn, &test_item(1, 1, 10)).unwrap();
        txn.commit().unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.order_count, 1);
        assert_eq!(stats.claimed_number_count, 1);
        assert_eq!(stats.order_item_count, 1);
        assert_eq!(stats.category_count, 0);
    }
}
