//! In-process order table shared by the memory and file backends.

use crate::StorageError;
use orders_types::{NewOrder, Order, OrderChanges};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rows keyed by id plus the next id to hand out.
///
/// Ids only grow, so iterating the map yields insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Snapshot", into = "Snapshot")]
pub(crate) struct OrderTable {
	next_id: i64,
	rows: BTreeMap<i64, Order>,
}

/// On-disk shape of a table.
#[derive(Serialize, Deserialize)]
struct Snapshot {
	next_id: i64,
	orders: Vec<Order>,
}

impl From<Snapshot> for OrderTable {
	fn from(snapshot: Snapshot) -> Self {
		let rows: BTreeMap<i64, Order> = snapshot
			.orders
			.into_iter()
			.map(|order| (order.id, order))
			.collect();
		// Never hand out an id that is already present
		let floor = rows.keys().next_back().map_or(1, |max| max + 1);
		Self {
			next_id: snapshot.next_id.max(floor),
			rows,
		}
	}
}

impl From<OrderTable> for Snapshot {
	fn from(table: OrderTable) -> Self {
		Self {
			next_id: table.next_id,
			orders: table.rows.into_values().collect(),
		}
	}
}

impl Default for OrderTable {
	fn default() -> Self {
		Self {
			next_id: 1,
			rows: BTreeMap::new(),
		}
	}
}

impl OrderTable {
	pub(crate) fn insert(&mut self, order: NewOrder) -> Order {
		let id = self.next_id;
		self.next_id += 1;
		let order = order.with_id(id);
		self.rows.insert(id, order.clone());
		order
	}

	pub(crate) fn list(&self) -> Vec<Order> {
		self.rows.values().cloned().collect()
	}

	pub(crate) fn get(&self, id: i64) -> Result<Order, StorageError> {
		self.rows.get(&id).cloned().ok_or(StorageError::NotFound)
	}

	pub(crate) fn update(&mut self, id: i64, changes: &OrderChanges) -> Result<Order, StorageError> {
		let order = self.rows.get_mut(&id).ok_or(StorageError::NotFound)?;
		changes.apply(order);
		Ok(order.clone())
	}

	pub(crate) fn delete(&mut self, id: i64) -> Result<Order, StorageError> {
		self.rows.remove(&id).ok_or(StorageError::NotFound)
	}

	pub(crate) fn len(&self) -> usize {
		self.rows.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ids_are_not_reused_after_delete() {
		let mut table = OrderTable::default();
		let first = table.insert(NewOrder::new("a", 1));
		let second = table.insert(NewOrder::new("b", 2));
		table.delete(second.id).unwrap();

		let third = table.insert(NewOrder::new("c", 3));
		assert_eq!(first.id, 1);
		assert_eq!(third.id, 3);
		assert_eq!(table.len(), 2);
	}

	#[test]
	fn test_snapshot_round_trip_keeps_counter() {
		let mut table = OrderTable::default();
		table.insert(NewOrder::new("a", 1));
		let removed = table.insert(NewOrder::new("b", 2));
		table.delete(removed.id).unwrap();

		let json = serde_json::to_string(&table).unwrap();
		let mut restored: OrderTable = serde_json::from_str(&json).unwrap();
		assert_eq!(restored.list(), table.list());
		assert_eq!(restored.insert(NewOrder::new("c", 3)).id, 3);
	}

	#[test]
	fn test_snapshot_with_stale_counter_is_corrected() {
		let json = r#"{"next_id":1,"orders":[{"id":5,"product_name":"x","quantity":1}]}"#;
		let mut table: OrderTable = serde_json::from_str(json).unwrap();
		assert_eq!(table.insert(NewOrder::new("y", 1)).id, 6);
	}

	#[test]
	fn test_update_missing_row() {
		let mut table = OrderTable::default();
		let result = table.update(9, &OrderChanges::default());
		assert!(matches!(result, Err(StorageError::NotFound)));
	}
}
