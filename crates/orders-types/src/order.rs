//! Order entity and related shapes.
//!
//! An [`Order`] is the only persisted resource. Its `id` is assigned by the
//! store on insert and never changes; `product_name` and `quantity` can be
//! overwritten through an [`OrderChanges`] set.

use serde::{Deserialize, Serialize};

/// Rows inserted into an empty store at startup.
pub const INITIAL_ORDERS: [(&str, i64); 3] =
	[("Product A", 10), ("Product B", 5), ("Product C", 20)];

/// A persisted order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	/// Store-assigned identifier.
	pub id: i64,
	/// Name of the ordered product.
	pub product_name: String,
	/// Number of units ordered.
	pub quantity: i64,
}

/// An order that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
	pub product_name: String,
	pub quantity: i64,
}

impl NewOrder {
	pub fn new(product_name: impl Into<String>, quantity: i64) -> Self {
		Self {
			product_name: product_name.into(),
			quantity,
		}
	}

	/// Attaches a store-assigned id, producing the persisted row.
	pub fn with_id(self, id: i64) -> Order {
		Order {
			id,
			product_name: self.product_name,
			quantity: self.quantity,
		}
	}
}

/// Returns the fixed seed rows as insertable orders.
pub fn initial_orders() -> Vec<NewOrder> {
	INITIAL_ORDERS
		.iter()
		.map(|(name, quantity)| NewOrder::new(*name, *quantity))
		.collect()
}

/// Field-level changes to apply to an existing order.
///
/// `None` means the field was not provided and keeps its stored value.
/// `Some` always overwrites, including empty strings and zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderChanges {
	pub product_name: Option<String>,
	pub quantity: Option<i64>,
}

impl OrderChanges {
	/// Returns true when no field is present.
	pub fn is_empty(&self) -> bool {
		self.product_name.is_none() && self.quantity.is_none()
	}

	/// Applies every present field to the given order.
	pub fn apply(&self, order: &mut Order) {
		if let Some(product_name) = &self.product_name {
			order.product_name = product_name.clone();
		}
		if let Some(quantity) = self.quantity {
			order.quantity = quantity;
		}
	}
}

/// Response body for a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
	pub id: i64,
	pub product_name: String,
	pub quantity: i64,
}

impl From<Order> for OrderResponse {
	fn from(order: Order) -> Self {
		Self {
			id: order.id,
			product_name: order.product_name,
			quantity: order.quantity,
		}
	}
}
