//! Payload validation for order requests.
//!
//! Request bodies arrive as raw JSON and are checked field by field, so every
//! problem in a payload is reported at once and a failed check never reaches
//! the store. Parsing returns a typed [`ValidationError`] instead of raising,
//! which leaves the HTTP status decision to the API layer.

use crate::{NewOrder, OrderChanges, OrderResponse};
use serde_json::{Map, Value};
use thiserror::Error;

/// A single problem found while validating a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
	/// A required field is absent.
	#[error("Field required")]
	Missing { field: String },
	/// A field holds a JSON value of the wrong type.
	#[error("Input should be a valid {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: &'static str,
		actual: &'static str,
	},
	/// An integer field holds a number with a fractional part.
	#[error("Input should be a valid integer, got a number with a fractional part")]
	FractionalNumber { field: String },
	/// A field has the right type but violates a value constraint.
	#[error("{message}")]
	InvalidValue { field: String, message: String },
}

impl ValidationIssue {
	/// Name of the offending field. Empty when the whole body is at fault.
	pub fn field(&self) -> &str {
		match self {
			Self::Missing { field }
			| Self::TypeMismatch { field, .. }
			| Self::FractionalNumber { field }
			| Self::InvalidValue { field, .. } => field.as_str(),
		}
	}

	/// Machine-readable issue code.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Missing { .. } => "missing",
			Self::TypeMismatch { expected, .. } => match *expected {
				"string" => "string_type",
				"integer" => "int_type",
				"array" => "list_type",
				_ => "model_type",
			},
			Self::FractionalNumber { .. } => "int_from_float",
			Self::InvalidValue { .. } => "value_error",
		}
	}
}

/// Failure returned when a payload does not meet its shape or value constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.issues))]
pub struct ValidationError {
	issues: Vec<ValidationIssue>,
}

fn describe(issues: &[ValidationIssue]) -> String {
	let details = issues
		.iter()
		.map(|issue| match issue.field() {
			"" => issue.to_string(),
			field => format!("{}: {}", field, issue),
		})
		.collect::<Vec<_>>()
		.join("; ");
	format!("{} validation error(s): {}", issues.len(), details)
}

impl ValidationError {
	pub fn new(issues: Vec<ValidationIssue>) -> Self {
		Self { issues }
	}

	pub fn issues(&self) -> &[ValidationIssue] {
		&self.issues
	}
}

impl From<ValidationIssue> for ValidationError {
	fn from(issue: ValidationIssue) -> Self {
		Self::new(vec![issue])
	}
}

/// Returns the JSON type name used in mismatch messages.
fn json_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(n) if n.is_f64() => "float",
		Value::Number(_) => "integer",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
	body.as_object().ok_or_else(|| {
		ValidationIssue::TypeMismatch {
			field: String::new(),
			expected: "object",
			actual: json_type(body),
		}
		.into()
	})
}

fn read_string(field: &str, value: &Value) -> Result<String, ValidationIssue> {
	value
		.as_str()
		.map(str::to_string)
		.ok_or_else(|| ValidationIssue::TypeMismatch {
			field: field.to_string(),
			expected: "string",
			actual: json_type(value),
		})
}

/// Reads an integral number. Floats without a fractional part (`1.0`) are
/// accepted; strings are not coerced.
fn read_integer(field: &str, value: &Value) -> Result<i64, ValidationIssue> {
	let out_of_range = || ValidationIssue::InvalidValue {
		field: field.to_string(),
		message: "Input should be a 64-bit signed integer".to_string(),
	};

	let Value::Number(number) = value else {
		return Err(ValidationIssue::TypeMismatch {
			field: field.to_string(),
			expected: "integer",
			actual: json_type(value),
		});
	};

	if let Some(int) = number.as_i64() {
		return Ok(int);
	}
	if number.is_u64() {
		return Err(out_of_range());
	}

	let float = number.as_f64().ok_or_else(out_of_range)?;
	if float.fract() != 0.0 {
		return Err(ValidationIssue::FractionalNumber {
			field: field.to_string(),
		});
	}
	if float < i64::MIN as f64 || float >= i64::MAX as f64 {
		return Err(out_of_range());
	}
	Ok(float as i64)
}

fn require_positive(field: &str, value: i64) -> Result<i64, ValidationIssue> {
	if value <= 0 {
		return Err(ValidationIssue::InvalidValue {
			field: field.to_string(),
			message: "Quantity must be positive".to_string(),
		});
	}
	Ok(value)
}

fn required<'a>(
	fields: &'a Map<String, Value>,
	field: &str,
) -> Result<&'a Value, ValidationIssue> {
	fields.get(field).ok_or_else(|| ValidationIssue::Missing {
		field: field.to_string(),
	})
}

/// Payload for creating an order.
///
/// Both fields are optional in the request and fall back to
/// [`OrderCreate::DEFAULT_PRODUCT_NAME`] and [`OrderCreate::DEFAULT_QUANTITY`].
/// The quantity must be strictly positive. Values are only reachable through
/// [`OrderCreate::new`], [`OrderCreate::from_json`] or the default, so every
/// instance has passed that check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreate {
	product_name: String,
	quantity: i64,
}

impl OrderCreate {
	pub const DEFAULT_PRODUCT_NAME: &'static str = "Test Product";
	pub const DEFAULT_QUANTITY: i64 = 10;

	/// Builds a create payload, rejecting non-positive quantities.
	pub fn new(product_name: impl Into<String>, quantity: i64) -> Result<Self, ValidationError> {
		let quantity = require_positive("quantity", quantity)?;
		Ok(Self {
			product_name: product_name.into(),
			quantity,
		})
	}

	/// Parses and validates a JSON request body.
	pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
		let fields = as_object(body)?;
		let mut issues = Vec::new();

		let product_name = match fields.get("product_name") {
			None => Some(Self::DEFAULT_PRODUCT_NAME.to_string()),
			Some(value) => read_string("product_name", value)
				.map_err(|issue| issues.push(issue))
				.ok(),
		};
		let quantity = match fields.get("quantity") {
			None => Some(Self::DEFAULT_QUANTITY),
			Some(value) => read_integer("quantity", value)
				.and_then(|quantity| require_positive("quantity", quantity))
				.map_err(|issue| issues.push(issue))
				.ok(),
		};

		match (product_name, quantity) {
			(Some(product_name), Some(quantity)) if issues.is_empty() => Ok(Self {
				product_name,
				quantity,
			}),
			_ => Err(ValidationError::new(issues)),
		}
	}

	pub fn product_name(&self) -> &str {
		&self.product_name
	}

	pub fn quantity(&self) -> i64 {
		self.quantity
	}
}

impl Default for OrderCreate {
	fn default() -> Self {
		Self {
			product_name: Self::DEFAULT_PRODUCT_NAME.to_string(),
			quantity: Self::DEFAULT_QUANTITY,
		}
	}
}

impl From<OrderCreate> for NewOrder {
	fn from(payload: OrderCreate) -> Self {
		NewOrder::new(payload.product_name, payload.quantity)
	}
}

/// Payload for updating an order.
///
/// Both fields are required. Unlike [`OrderCreate`], the quantity is not
/// checked for positivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
	product_name: String,
	quantity: i64,
}

impl OrderUpdate {
	pub fn new(product_name: impl Into<String>, quantity: i64) -> Self {
		Self {
			product_name: product_name.into(),
			quantity,
		}
	}

	/// Parses and validates a JSON request body.
	pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
		let fields = as_object(body)?;
		let mut issues = Vec::new();

		let product_name = required(fields, "product_name")
			.and_then(|value| read_string("product_name", value))
			.map_err(|issue| issues.push(issue))
			.ok();
		let quantity = required(fields, "quantity")
			.and_then(|value| read_integer("quantity", value))
			.map_err(|issue| issues.push(issue))
			.ok();

		match (product_name, quantity) {
			(Some(product_name), Some(quantity)) if issues.is_empty() => Ok(Self {
				product_name,
				quantity,
			}),
			_ => Err(ValidationError::new(issues)),
		}
	}

	pub fn product_name(&self) -> &str {
		&self.product_name
	}

	pub fn quantity(&self) -> i64 {
		self.quantity
	}
}

impl From<OrderUpdate> for OrderChanges {
	fn from(payload: OrderUpdate) -> Self {
		Self {
			product_name: Some(payload.product_name),
			quantity: Some(payload.quantity),
		}
	}
}

impl OrderResponse {
	/// Checks that a JSON value has the order response shape.
	pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
		let fields = as_object(body)?;
		let mut issues = Vec::new();

		let id = required(fields, "id")
			.and_then(|value| read_integer("id", value))
			.map_err(|issue| issues.push(issue))
			.ok();
		let product_name = required(fields, "product_name")
			.and_then(|value| read_string("product_name", value))
			.map_err(|issue| issues.push(issue))
			.ok();
		let quantity = required(fields, "quantity")
			.and_then(|value| read_integer("quantity", value))
			.map_err(|issue| issues.push(issue))
			.ok();

		match (id, product_name, quantity) {
			(Some(id), Some(product_name), Some(quantity)) if issues.is_empty() => Ok(Self {
				id,
				product_name,
				quantity,
			}),
			_ => Err(ValidationError::new(issues)),
		}
	}
}

/// Checks that a list response is an array whose every element has the order
/// response shape.
pub fn validate_orders_response(body: &Value) -> Result<Vec<OrderResponse>, ValidationError> {
	let items = body.as_array().ok_or_else(|| {
		ValidationError::from(ValidationIssue::TypeMismatch {
			field: String::new(),
			expected: "array",
			actual: json_type(body),
		})
	})?;

	let mut orders = Vec::with_capacity(items.len());
	let mut issues = Vec::new();
	for (index, item) in items.iter().enumerate() {
		match OrderResponse::from_json(item) {
			Ok(order) => orders.push(order),
			Err(e) => issues.extend(e.issues.into_iter().map(|issue| prefix(index, issue))),
		}
	}

	if issues.is_empty() {
		Ok(orders)
	} else {
		Err(ValidationError::new(issues))
	}
}

fn prefix(index: usize, issue: ValidationIssue) -> ValidationIssue {
	let located = |field: String| {
		if field.is_empty() {
			index.to_string()
		} else {
			format!("{}.{}", index, field)
		}
	};
	match issue {
		ValidationIssue::Missing { field } => ValidationIssue::Missing {
			field: located(field),
		},
		ValidationIssue::TypeMismatch {
			field,
			expected,
			actual,
		} => ValidationIssue::TypeMismatch {
			field: located(field),
			expected,
			actual,
		},
		ValidationIssue::FractionalNumber { field } => ValidationIssue::FractionalNumber {
			field: located(field),
		},
		ValidationIssue::InvalidValue { field, message } => ValidationIssue::InvalidValue {
			field: located(field),
			message,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_create_defaults_when_fields_absent() {
		let payload = OrderCreate::from_json(&json!({})).unwrap();
		assert_eq!(payload, OrderCreate::default());
		assert_eq!(payload.product_name(), "Test Product");
		assert_eq!(payload.quantity(), 10);
	}

	#[test]
	fn test_create_accepts_any_string_product_name() {
		for name in ["Test Product", "T", "", " ", "Product#$%", "<script>alert</script>"] {
			let payload = OrderCreate::from_json(&json!({ "product_name": name, "quantity": 1 }))
				.unwrap();
			assert_eq!(payload.product_name(), name);
		}
	}

	#[test]
	fn test_create_rejects_non_positive_quantity() {
		for quantity in [0, -1, i64::MIN] {
			let err = OrderCreate::from_json(&json!({ "quantity": quantity })).unwrap_err();
			assert_eq!(err.issues().len(), 1);
			assert_eq!(err.issues()[0].kind(), "value_error");
			assert_eq!(err.issues()[0].field(), "quantity");
		}
		assert!(OrderCreate::new("x", 0).is_err());
		assert!(OrderCreate::new("x", 1).is_ok());
	}

	#[test]
	fn test_create_rejects_fractional_quantity_as_type_problem() {
		for quantity in [json!(0.1), json!(10.1), json!(-0.1), json!(0.01)] {
			let err = OrderCreate::from_json(&json!({ "quantity": quantity })).unwrap_err();
			assert!(matches!(
				err.issues()[0],
				ValidationIssue::FractionalNumber { .. }
			));
			assert_eq!(err.issues()[0].kind(), "int_from_float");
		}
	}

	#[test]
	fn test_every_create_payload_reaches_store_positive() {
		let payloads = [
			OrderCreate::default(),
			OrderCreate::new("Direct", 3).unwrap(),
			OrderCreate::from_json(&json!({ "product_name": "Parsed", "quantity": 7 })).unwrap(),
		];
		for payload in payloads {
			let order = NewOrder::from(payload.clone());
			assert_eq!(order.product_name, payload.product_name());
			assert!(order.quantity > 0);
		}
	}

	#[test]
	fn test_create_accepts_integral_float() {
		let payload = OrderCreate::from_json(&json!({ "quantity": 1.0 })).unwrap();
		assert_eq!(payload.quantity(), 1);
	}

	#[test]
	fn test_create_rejects_string_quantity() {
		let err = OrderCreate::from_json(&json!({ "quantity": "1.1" })).unwrap_err();
		assert_eq!(
			err.issues()[0],
			ValidationIssue::TypeMismatch {
				field: "quantity".to_string(),
				expected: "integer",
				actual: "string",
			}
		);
	}

	#[test]
	fn test_create_rejects_out_of_range_quantity() {
		let err = OrderCreate::from_json(&json!({ "quantity": u64::MAX })).unwrap_err();
		assert_eq!(err.issues()[0].kind(), "value_error");
		let err = OrderCreate::from_json(&json!({ "quantity": 1e30 })).unwrap_err();
		assert_eq!(err.issues()[0].kind(), "value_error");
	}

	#[test]
	fn test_create_rejects_non_string_product_name() {
		for name in [json!(1), json!(1.0), json!(100.9), json!(["Test"]), json!({"test": "test"}), json!(null)] {
			let err = OrderCreate::from_json(&json!({ "product_name": name })).unwrap_err();
			assert_eq!(err.issues()[0].kind(), "string_type");
		}
	}

	#[test]
	fn test_create_reports_every_issue() {
		let err = OrderCreate::from_json(&json!({ "product_name": 5, "quantity": -3 })).unwrap_err();
		let fields: Vec<_> = err.issues().iter().map(|i| i.field().to_string()).collect();
		assert_eq!(fields, vec!["product_name", "quantity"]);
		assert!(err.to_string().starts_with("2 validation error(s)"));
	}

	#[test]
	fn test_non_object_body_is_rejected() {
		let err = OrderCreate::from_json(&json!([1, 2])).unwrap_err();
		assert_eq!(err.issues()[0].kind(), "model_type");
		assert_eq!(err.issues()[0].field(), "");
	}

	#[test]
	fn test_update_requires_both_fields() {
		let err = OrderUpdate::from_json(&json!({})).unwrap_err();
		assert_eq!(err.issues().len(), 2);
		assert!(err.issues().iter().all(|i| i.kind() == "missing"));
	}

	#[test]
	fn test_update_allows_non_positive_quantity() {
		let payload = OrderUpdate::from_json(&json!({ "product_name": "", "quantity": 0 })).unwrap();
		assert_eq!(payload, OrderUpdate::new("", 0));

		let changes = OrderChanges::from(payload);
		assert_eq!(changes.product_name.as_deref(), Some(""));
		assert_eq!(changes.quantity, Some(0));
	}

	#[test]
	fn test_response_reconstructs_from_accepted_create() {
		let payload = OrderCreate::new("Round Trip", 4).unwrap();
		let order = NewOrder::from(payload.clone()).with_id(12);
		let body = serde_json::to_value(OrderResponse::from(order)).unwrap();

		let response = OrderResponse::from_json(&body).unwrap();
		assert_eq!(response.id, 12);
		assert_eq!(response.product_name, payload.product_name());
		assert_eq!(response.quantity, payload.quantity());
	}

	#[test]
	fn test_orders_response_validation() {
		let good = json!([
			{ "id": 1, "product_name": "Product A", "quantity": 10 },
			{ "id": 2, "product_name": "Product B", "quantity": 5 },
		]);
		assert_eq!(validate_orders_response(&good).unwrap().len(), 2);

		let bad = json!([
			{ "id": 1, "product_name": "Product A", "quantity": 10 },
			{ "id": 2, "quantity": "5" },
		]);
		let err = validate_orders_response(&bad).unwrap_err();
		let fields: Vec<_> = err.issues().iter().map(|i| i.field().to_string()).collect();
		assert_eq!(fields, vec!["1.product_name", "1.quantity"]);

		assert!(validate_orders_response(&json!({})).is_err());
	}
}
