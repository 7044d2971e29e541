//! SQLite storage backend for the orders service.
//!
//! Rows live in a single `orders` table. The connection is opened by
//! [`StorageInterface::open`] and guarded by a mutex; each operation locks it
//! on a blocking thread for the duration of one statement or transaction.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use orders_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, NewOrder, Order, OrderChanges, Schema,
	SchemaError,
};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_DATABASE_PATH: &str = "./data/orders.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Path value that selects a private in-memory database.
const IN_MEMORY: &str = ":memory:";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS orders (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	product_name TEXT NOT NULL,
	quantity INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_orders_product_name ON orders (product_name);
";

fn db_error(err: rusqlite::Error) -> StorageError {
	StorageError::Backend(err.to_string())
}

fn read_order(row: &Row<'_>) -> rusqlite::Result<Order> {
	Ok(Order {
		id: row.get(0)?,
		product_name: row.get(1)?,
		quantity: row.get(2)?,
	})
}

fn select_order(conn: &Connection, id: i64) -> Result<Order, StorageError> {
	conn.query_row(
		"SELECT id, product_name, quantity FROM orders WHERE id = ?1",
		params![id],
		read_order,
	)
	.optional()
	.map_err(db_error)?
	.ok_or(StorageError::NotFound)
}

/// SQLite-backed storage implementation.
pub struct SqliteStorage {
	path: PathBuf,
	busy_timeout: Duration,
	/// Open connection. `None` until opened and after close.
	connection: Arc<Mutex<Option<Connection>>>,
}

impl SqliteStorage {
	pub fn new(path: PathBuf, busy_timeout: Duration) -> Self {
		Self {
			path,
			busy_timeout,
			connection: Arc::new(Mutex::new(None)),
		}
	}

	fn connect(&self) -> Result<Connection, StorageError> {
		let conn = if self.path.as_os_str() == IN_MEMORY {
			Connection::open_in_memory().map_err(db_error)?
		} else {
			if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
				std::fs::create_dir_all(parent).map_err(|e| StorageError::Backend(e.to_string()))?;
			}
			let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
				| OpenFlags::SQLITE_OPEN_CREATE
				| OpenFlags::SQLITE_OPEN_FULL_MUTEX;
			Connection::open_with_flags(&self.path, flags).map_err(db_error)?
		};

		conn.busy_timeout(self.busy_timeout).map_err(db_error)?;
		conn.execute_batch(SCHEMA).map_err(db_error)?;
		Ok(conn)
	}

	/// Runs `f` with the connection locked on a blocking thread.
	async fn with_connection<T, F>(&self, f: F) -> Result<T, StorageError>
	where
		T: Send + 'static,
		F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
	{
		let connection = Arc::clone(&self.connection);
		tokio::task::spawn_blocking(move || {
			let mut guard = connection
				.lock()
				.map_err(|_| StorageError::Backend("sqlite connection lock poisoned".into()))?;
			let conn = guard
				.as_mut()
				.ok_or_else(|| StorageError::Backend("sqlite storage is not open".into()))?;
			f(conn)
		})
		.await
		.map_err(|e| StorageError::Backend(e.to_string()))?
	}
}

#[async_trait]
impl StorageInterface for SqliteStorage {
	async fn open(&self) -> Result<(), StorageError> {
		let conn = self.connect()?;
		let mut guard = self
			.connection
			.lock()
			.map_err(|_| StorageError::Backend("sqlite connection lock poisoned".into()))?;
		*guard = Some(conn);
		tracing::debug!(path = %self.path.display(), "Opened sqlite store");
		Ok(())
	}

	async fn insert(&self, order: NewOrder) -> Result<Order, StorageError> {
		self.with_connection(move |conn| {
			conn.execute(
				"INSERT INTO orders (product_name, quantity) VALUES (?1, ?2)",
				params![order.product_name, order.quantity],
			)
			.map_err(db_error)?;
			Ok(order.with_id(conn.last_insert_rowid()))
		})
		.await
	}

	async fn list(&self) -> Result<Vec<Order>, StorageError> {
		self.with_connection(|conn| {
			let mut stmt = conn
				.prepare_cached("SELECT id, product_name, quantity FROM orders ORDER BY id")
				.map_err(db_error)?;
			let orders = stmt
				.query_map([], read_order)
				.map_err(db_error)?
				.collect::<rusqlite::Result<Vec<_>>>()
				.map_err(db_error)?;
			Ok(orders)
		})
		.await
	}

	async fn get(&self, id: i64) -> Result<Order, StorageError> {
		self.with_connection(move |conn| select_order(conn, id)).await
	}

	async fn update(&self, id: i64, changes: &OrderChanges) -> Result<Order, StorageError> {
		let changes = changes.clone();
		self.with_connection(move |conn| {
			let tx = conn.transaction().map_err(db_error)?;
			let mut order = select_order(&tx, id)?;
			changes.apply(&mut order);
			tx.execute(
				"UPDATE orders SET product_name = ?1, quantity = ?2 WHERE id = ?3",
				params![order.product_name, order.quantity, id],
			)
			.map_err(db_error)?;
			tx.commit().map_err(db_error)?;
			Ok(order)
		})
		.await
	}

	async fn delete(&self, id: i64) -> Result<Order, StorageError> {
		self.with_connection(move |conn| {
			let tx = conn.transaction().map_err(db_error)?;
			let order = select_order(&tx, id)?;
			tx.execute("DELETE FROM orders WHERE id = ?1", params![id])
				.map_err(db_error)?;
			tx.commit().map_err(db_error)?;
			Ok(order)
		})
		.await
	}

	async fn count(&self) -> Result<usize, StorageError> {
		self.with_connection(|conn| {
			let count: i64 = conn
				.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
				.map_err(db_error)?;
			usize::try_from(count).map_err(|e| StorageError::Backend(e.to_string()))
		})
		.await
	}

	async fn close(&self) -> Result<(), StorageError> {
		let conn = self
			.connection
			.lock()
			.map_err(|_| StorageError::Backend("sqlite connection lock poisoned".into()))?
			.take();
		if let Some(conn) = conn {
			conn.close().map_err(|(_, e)| db_error(e))?;
			tracing::debug!(path = %self.path.display(), "Closed sqlite store");
		}
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SqliteStorageSchema)
	}
}

/// Configuration schema for SqliteStorage.
pub struct SqliteStorageSchema;

impl ConfigSchema for SqliteStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("database_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if path.trim().is_empty() => {
							Err("database_path cannot be empty".to_string())
						},
						_ => Ok(()),
					}
				}),
				Field::new(
					"busy_timeout_ms",
					FieldType::Integer {
						min: Some(0),
						max: Some(60_000),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a SQLite storage backend from configuration.
///
/// Configuration parameters:
/// - `database_path`: Database file, or `":memory:"` (default: "./data/orders.db")
/// - `busy_timeout_ms`: How long to wait on a locked database (default: 5000)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	SqliteStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let database_path = config
		.get("database_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_DATABASE_PATH);
	let busy_timeout_ms = config
		.get("busy_timeout_ms")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);

	Ok(Box::new(SqliteStorage::new(
		PathBuf::from(database_path),
		Duration::from_millis(busy_timeout_ms),
	)))
}

/// Registry for the SQLite storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "sqlite";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
