//! In-memory storage backend implementation for the orders service.
//!
//! Useful for tests and development where persistence across restarts is not
//! required.

use crate::table::OrderTable;
use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use orders_types::{
	ConfigSchema, ImplementationRegistry, NewOrder, Order, OrderChanges, Schema, SchemaError,
};
use tokio::sync::RwLock;

/// In-memory storage implementation.
pub struct MemoryStorage {
	/// The order table protected by a read-write lock. `None` until opened
	/// and after close.
	table: RwLock<Option<OrderTable>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance. The table exists once opened.
	pub fn new() -> Self {
		Self {
			table: RwLock::new(None),
		}
	}

	async fn write<T>(
		&self,
		apply: impl FnOnce(&mut OrderTable) -> Result<T, StorageError>,
	) -> Result<T, StorageError> {
		let mut guard = self.table.write().await;
		guard.as_mut().map(apply).ok_or_else(closed)?
	}

	async fn read<T>(
		&self,
		query: impl FnOnce(&OrderTable) -> Result<T, StorageError>,
	) -> Result<T, StorageError> {
		let guard = self.table.read().await;
		guard.as_ref().map(query).ok_or_else(closed)?
	}
}

fn closed() -> StorageError {
	StorageError::Backend("memory storage is not open".into())
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn open(&self) -> Result<(), StorageError> {
		self.table.write().await.get_or_insert_with(OrderTable::default);
		Ok(())
	}

	async fn insert(&self, order: NewOrder) -> Result<Order, StorageError> {
		self.write(|table| Ok(table.insert(order))).await
	}

	async fn list(&self) -> Result<Vec<Order>, StorageError> {
		self.read(|table| Ok(table.list())).await
	}

	async fn get(&self, id: i64) -> Result<Order, StorageError> {
		self.read(|table| table.get(id)).await
	}

	async fn update(&self, id: i64, changes: &OrderChanges) -> Result<Order, StorageError> {
		self.write(|table| table.update(id, changes)).await
	}

	async fn delete(&self, id: i64) -> Result<Order, StorageError> {
		self.write(|table| table.delete(id)).await
	}

	async fn count(&self) -> Result<usize, StorageError> {
		self.read(|table| Ok(table.len())).await
	}

	async fn close(&self) -> Result<(), StorageError> {
		self.table.write().await.take();
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		// No settings, but the section must still be a table
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
///
/// Configuration parameters:
/// - None required for memory storage
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	async fn open_storage() -> MemoryStorage {
		let storage = MemoryStorage::new();
		storage.open().await.unwrap();
		storage
	}

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = open_storage().await;

		let created = storage
			.insert(NewOrder::new("Test Product", 10))
			.await
			.unwrap();
		assert_eq!(created.id, 1);

		let retrieved = storage.get(created.id).await.unwrap();
		assert_eq!(retrieved, created);

		let deleted = storage.delete(created.id).await.unwrap();
		assert_eq!(deleted, created);

		let result = storage.get(created.id).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_update_overwrites_present_fields() {
		let storage = open_storage().await;
		let created = storage.insert(NewOrder::new("Before", 4)).await.unwrap();

		let changes = OrderChanges {
			product_name: Some(String::new()),
			quantity: Some(0),
		};
		let updated = storage.update(created.id, &changes).await.unwrap();
		assert_eq!(updated.id, created.id);
		assert_eq!(updated.product_name, "");
		assert_eq!(updated.quantity, 0);
	}

	#[tokio::test]
	async fn test_update_missing_leaves_table_unchanged() {
		let storage = open_storage().await;
		storage.insert(NewOrder::new("Keep", 1)).await.unwrap();

		let changes = OrderChanges {
			product_name: Some("Other".to_string()),
			quantity: Some(2),
		};
		let result = storage.update(1000, &changes).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
		assert_eq!(storage.list().await.unwrap()[0].product_name, "Keep");
		assert_eq!(storage.count().await.unwrap(), 1);
	}

	#[tokio::test]
	async fn test_list_keeps_insertion_order() {
		let storage = open_storage().await;
		for name in ["c", "a", "b"] {
			storage.insert(NewOrder::new(name, 1)).await.unwrap();
		}
		let names: Vec<_> = storage
			.list()
			.await
			.unwrap()
			.into_iter()
			.map(|o| o.product_name)
			.collect();
		assert_eq!(names, vec!["c", "a", "b"]);
	}

	#[tokio::test]
	async fn test_operations_fail_when_closed() {
		let storage = MemoryStorage::new();
		assert!(matches!(
			storage.list().await,
			Err(StorageError::Backend(_))
		));

		storage.open().await.unwrap();
		storage.insert(NewOrder::new("Before close", 1)).await.unwrap();
		storage.close().await.unwrap();

		assert!(storage.insert(NewOrder::new("After close", 1)).await.is_err());
		assert!(storage.get(1).await.is_err());
		assert!(storage.count().await.is_err());
	}

	#[test]
	fn test_factory_rejects_non_table_config() {
		let result = create_storage(&toml::Value::Integer(3));
		assert!(matches!(result, Err(StorageError::Configuration(_))));
	}
}
