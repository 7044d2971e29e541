//! Orders API Implementation
//!
//! This module implements the order endpoints: payload validation, the call
//! into the store and the mapping of store outcomes to API errors. The HTTP
//! plumbing lives in the server module.

use orders_storage::{StorageError, StorageService};
use orders_types::{
	APIError, OrderChanges, OrderCreate, OrderResponse, OrderUpdate, ValidationError,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

/// Errors that can occur during order processing.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("Order not found: {0}")]
	NotFound(i64),
	#[error("Invalid order payload: {0}")]
	Validation(#[from] ValidationError),
	#[error("Storage error: {0}")]
	Storage(StorageError),
}

impl OrderError {
	/// Maps a store failure for the given id, keeping misses distinct.
	fn from_storage(order_id: i64, err: StorageError) -> Self {
		match err {
			StorageError::NotFound => OrderError::NotFound(order_id),
			other => OrderError::Storage(other),
		}
	}
}

impl From<OrderError> for APIError {
	fn from(err: OrderError) -> Self {
		match err {
			OrderError::NotFound(_) => APIError::order_not_found(),
			OrderError::Validation(e) => APIError::validation("body", &e),
			OrderError::Storage(e) => {
				// Backend details stay in the logs
				error!(error = %e, "Order store failure");
				APIError::InternalServerError {
					message: "Internal server error".to_string(),
				}
			},
		}
	}
}

/// Handles POST /orders requests.
///
/// Absent fields take their defaults; a present quantity must be positive.
pub async fn create_order(
	storage: &StorageService,
	body: &Value,
) -> Result<OrderResponse, OrderError> {
	let payload = OrderCreate::from_json(body)?;
	let order = storage
		.create_order(payload.into())
		.await
		.map_err(OrderError::Storage)?;

	info!(
		order_id = order.id,
		product_name = %order.product_name,
		quantity = order.quantity,
		"Created order"
	);
	Ok(order.into())
}

/// Handles GET /orders requests.
pub async fn list_orders(storage: &StorageService) -> Result<Vec<OrderResponse>, OrderError> {
	let orders = storage.list_orders().await.map_err(OrderError::Storage)?;
	Ok(orders.into_iter().map(OrderResponse::from).collect())
}

/// Handles GET /orders/{order_id} requests.
pub async fn get_order(
	storage: &StorageService,
	order_id: i64,
) -> Result<OrderResponse, OrderError> {
	storage
		.get_order(order_id)
		.await
		.map(OrderResponse::from)
		.map_err(|e| OrderError::from_storage(order_id, e))
}

/// Handles PUT /orders/{order_id} requests.
///
/// Both fields are required and replace the stored values as given. The body
/// is validated before the row is looked up.
pub async fn update_order(
	storage: &StorageService,
	order_id: i64,
	body: &Value,
) -> Result<OrderResponse, OrderError> {
	let payload = OrderUpdate::from_json(body)?;
	let changes = OrderChanges::from(payload);
	let order = storage
		.update_order(order_id, &changes)
		.await
		.map_err(|e| OrderError::from_storage(order_id, e))?;

	info!(order_id, "Updated order");
	Ok(order.into())
}

/// Handles DELETE /orders/{order_id} requests.
///
/// Returns the row as it was before removal.
pub async fn delete_order(
	storage: &StorageService,
	order_id: i64,
) -> Result<OrderResponse, OrderError> {
	let order = storage
		.delete_order(order_id)
		.await
		.map_err(|e| OrderError::from_storage(order_id, e))?;

	info!(order_id, "Deleted order");
	Ok(order.into())
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::StatusCode;
	use orders_storage::implementations::memory::MemoryStorage;
	use orders_types::initial_orders;
	use serde_json::json;

	async fn seeded_storage() -> StorageService {
		let storage = StorageService::open(Box::new(MemoryStorage::new()))
			.await
			.unwrap();
		storage.seed_if_empty(initial_orders()).await.unwrap();
		storage
	}

	#[tokio::test]
	async fn test_create_applies_defaults() {
		let storage = seeded_storage().await;

		let created = create_order(&storage, &json!({})).await.unwrap();
		assert_eq!(created.id, 4);
		assert_eq!(created.product_name, "Test Product");
		assert_eq!(created.quantity, 10);
	}

	#[tokio::test]
	async fn test_create_rejects_non_positive_quantity() {
		let storage = seeded_storage().await;

		for quantity in [0, -1] {
			let body = json!({ "product_name": "Zero", "quantity": quantity });
			let result = create_order(&storage, &body).await;
			assert!(matches!(result, Err(OrderError::Validation(_))));
		}
		assert_eq!(list_orders(&storage).await.unwrap().len(), 3);
	}

	#[tokio::test]
	async fn test_update_missing_order() {
		let storage = seeded_storage().await;

		let body = json!({ "product_name": "Nope", "quantity": 1 });
		let result = update_order(&storage, 1000, &body).await;
		assert!(matches!(result, Err(OrderError::NotFound(1000))));
	}

	#[tokio::test]
	async fn test_update_validates_before_lookup() {
		let storage = seeded_storage().await;

		let result = update_order(&storage, 1000, &json!({ "quantity": 1 })).await;
		assert!(matches!(result, Err(OrderError::Validation(_))));
	}

	#[tokio::test]
	async fn test_update_accepts_zero_quantity() {
		let storage = seeded_storage().await;

		let body = json!({ "product_name": "", "quantity": 0 });
		let updated = update_order(&storage, 2, &body).await.unwrap();
		assert_eq!(updated.product_name, "");
		assert_eq!(updated.quantity, 0);
		assert_eq!(get_order(&storage, 2).await.unwrap(), updated);
	}

	#[tokio::test]
	async fn test_delete_returns_prior_row() {
		let storage = seeded_storage().await;

		let deleted = delete_order(&storage, 3).await.unwrap();
		assert_eq!(deleted.product_name, "Product C");
		assert_eq!(deleted.quantity, 20);
		assert!(matches!(
			get_order(&storage, 3).await,
			Err(OrderError::NotFound(3))
		));
		assert!(matches!(
			delete_order(&storage, 3).await,
			Err(OrderError::NotFound(3))
		));
	}

	#[test]
	fn test_error_status_mapping() {
		let not_found = APIError::from(OrderError::NotFound(1));
		assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

		let storage = APIError::from(OrderError::Storage(StorageError::Backend("down".into())));
		assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
		assert!(!storage.to_string().contains("down"));
	}
}
