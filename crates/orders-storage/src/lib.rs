//! Storage module for the orders service.
//!
//! This module provides the order table abstraction and its backends. A
//! backend is constructed from configuration, opened once at startup and
//! closed at shutdown; every call in between acquires its connection or lock
//! for the duration of that call only.

use async_trait::async_trait;
use orders_types::{ConfigSchema, ImplementationRegistry, NewOrder, Order, OrderChanges};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
	pub mod sqlite;
}

mod table;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// No row exists for the requested id.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for order table backends.
///
/// Ids are assigned by the backend on insert, are unique, and are never
/// reused after a delete. `list` returns rows in insertion order.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Prepares the backend for use (creates the table, loads snapshots).
	async fn open(&self) -> Result<(), StorageError>;

	/// Inserts a row and returns it with its assigned id.
	async fn insert(&self, order: NewOrder) -> Result<Order, StorageError>;

	/// Returns every row in insertion order.
	async fn list(&self) -> Result<Vec<Order>, StorageError>;

	/// Point lookup by id.
	async fn get(&self, id: i64) -> Result<Order, StorageError>;

	/// Applies the present fields of `changes` to an existing row and returns
	/// the updated row.
	async fn update(&self, id: i64, changes: &OrderChanges) -> Result<Order, StorageError>;

	/// Removes a row and returns its contents as they were before removal.
	async fn delete(&self, id: i64) -> Result<Order, StorageError>;

	/// Number of stored rows.
	async fn count(&self) -> Result<usize, StorageError>;

	/// Releases the backend's resources. Later calls fail.
	async fn close(&self) -> Result<(), StorageError> {
		Ok(())
	}

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory, sqlite};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
		(sqlite::Registry::NAME, sqlite::Registry::factory()),
	]
}

/// Store handle passed to the API layer.
///
/// Wraps a backend and logs every mutation. The handle is opened explicitly
/// with [`StorageService::open`] and must be closed with
/// [`StorageService::close`].
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Opens the backend and returns the ready handle.
	pub async fn open(backend: Box<dyn StorageInterface>) -> Result<Self, StorageError> {
		backend.open().await?;
		Ok(Self::new(backend))
	}

	/// Inserts the given rows when the table is empty.
	///
	/// Returns the number of rows inserted.
	pub async fn seed_if_empty(&self, orders: Vec<NewOrder>) -> Result<usize, StorageError> {
		let existing = self.backend.count().await?;
		if existing > 0 {
			tracing::debug!(existing, "Store already populated, skipping seed");
			return Ok(0);
		}

		let mut inserted = 0;
		for order in orders {
			self.backend.insert(order).await?;
			inserted += 1;
		}
		tracing::info!(inserted, "Seeded initial orders");
		Ok(inserted)
	}

	pub async fn create_order(&self, order: NewOrder) -> Result<Order, StorageError> {
		let order = self.backend.insert(order).await?;
		tracing::debug!(order_id = order.id, "Inserted order");
		Ok(order)
	}

	pub async fn list_orders(&self) -> Result<Vec<Order>, StorageError> {
		self.backend.list().await
	}

	pub async fn get_order(&self, id: i64) -> Result<Order, StorageError> {
		self.backend.get(id).await
	}

	pub async fn update_order(
		&self,
		id: i64,
		changes: &OrderChanges,
	) -> Result<Order, StorageError> {
		let order = self.backend.update(id, changes).await?;
		tracing::debug!(order_id = id, "Updated order");
		Ok(order)
	}

	pub async fn delete_order(&self, id: i64) -> Result<Order, StorageError> {
		let order = self.backend.delete(id).await?;
		tracing::debug!(order_id = id, "Deleted order");
		Ok(order)
	}

	/// Closes the backend.
	pub async fn close(&self) -> Result<(), StorageError> {
		self.backend.close().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use orders_types::initial_orders;

	#[tokio::test]
	async fn test_seed_only_when_empty() {
		let service = StorageService::open(Box::new(MemoryStorage::new()))
			.await
			.unwrap();

		assert_eq!(service.seed_if_empty(initial_orders()).await.unwrap(), 3);
		assert_eq!(service.seed_if_empty(initial_orders()).await.unwrap(), 0);

		let orders = service.list_orders().await.unwrap();
		let names: Vec<_> = orders.iter().map(|o| o.product_name.as_str()).collect();
		assert_eq!(names, vec!["Product A", "Product B", "Product C"]);
		assert_eq!(orders[0].id, 1);
	}

	#[tokio::test]
	async fn test_registry_lists_every_backend() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["file", "memory", "sqlite"]);
	}

	#[tokio::test]
	async fn test_memory_factory_builds_usable_backend() {
		let factory = implementations::memory::Registry::factory();
		let backend = factory(&toml::Value::Table(toml::map::Map::new())).unwrap();
		let service = StorageService::open(backend).await.unwrap();

		let created = service
			.create_order(NewOrder::new("Boxed", 2))
			.await
			.unwrap();
		assert_eq!(service.get_order(created.id).await.unwrap(), created);
		service.close().await.unwrap();
	}
}
