//! File-backed storage implementation for the orders service.
//!
//! The whole table is held in memory and written to a JSON snapshot after
//! every mutation. Writes go to a temporary file that is then renamed over
//! the snapshot, so a crash never leaves a half-written table behind.

use crate::table::OrderTable;
use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use orders_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, NewOrder, Order, OrderChanges, Schema,
	SchemaError,
};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

const DEFAULT_STORAGE_PATH: &str = "./data/orders.json";

/// File-based storage implementation.
pub struct FileStorage {
	/// Path of the JSON snapshot.
	path: PathBuf,
	/// Loaded table. `None` until opened and after close.
	table: Mutex<Option<OrderTable>>,
}

impl FileStorage {
	pub fn new(path: PathBuf) -> Self {
		Self {
			path,
			table: Mutex::new(None),
		}
	}

	async fn load(&self) -> Result<OrderTable, StorageError> {
		match fs::read(&self.path).await {
			Ok(data) => serde_json::from_slice(&data)
				.map_err(|e| StorageError::Serialization(e.to_string())),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(OrderTable::default()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn persist(&self, table: &OrderTable) -> Result<(), StorageError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let data =
			serde_json::to_vec_pretty(table).map_err(|e| StorageError::Serialization(e.to_string()))?;

		let temp_path = self.path.with_extension("tmp");
		fs::write(&temp_path, data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &self.path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	/// Runs a mutation against a copy of the table, persists the copy and
	/// only then makes it current.
	async fn mutate<T>(
		&self,
		apply: impl FnOnce(&mut OrderTable) -> Result<T, StorageError>,
	) -> Result<T, StorageError> {
		let mut guard = self.table.lock().await;
		let current = guard.as_ref().ok_or_else(closed)?;

		let mut next = current.clone();
		let result = apply(&mut next)?;
		self.persist(&next).await?;
		*guard = Some(next);
		Ok(result)
	}

	async fn read<T>(&self, query: impl FnOnce(&OrderTable) -> T) -> Result<T, StorageError> {
		let guard = self.table.lock().await;
		guard.as_ref().map(query).ok_or_else(closed)
	}
}

fn closed() -> StorageError {
	StorageError::Backend("file storage is not open".into())
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn open(&self) -> Result<(), StorageError> {
		let table = self.load().await?;
		tracing::debug!(path = %self.path.display(), rows = table.len(), "Loaded order snapshot");
		*self.table.lock().await = Some(table);
		Ok(())
	}

	async fn insert(&self, order: NewOrder) -> Result<Order, StorageError> {
		self.mutate(|table| Ok(table.insert(order))).await
	}

	async fn list(&self) -> Result<Vec<Order>, StorageError> {
		self.read(OrderTable::list).await
	}

	async fn get(&self, id: i64) -> Result<Order, StorageError> {
		self.read(|table| table.get(id)).await?
	}

	async fn update(&self, id: i64, changes: &OrderChanges) -> Result<Order, StorageError> {
		self.mutate(|table| table.update(id, changes)).await
	}

	async fn delete(&self, id: i64) -> Result<Order, StorageError> {
		self.mutate(|table| table.delete(id)).await
	}

	async fn count(&self) -> Result<usize, StorageError> {
		self.read(OrderTable::len).await
	}

	async fn close(&self) -> Result<(), StorageError> {
		self.table.lock().await.take();
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if path.trim().is_empty() => {
						Err("storage_path cannot be empty".to_string())
					},
					_ => Ok(()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Snapshot file (default: "./data/orders.json")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
