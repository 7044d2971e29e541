//! API error types for the orders HTTP API.
//!
//! Error bodies carry a single `detail` member: a plain message for lookups
//! that miss, or a list of located issues for payloads that fail validation.

use crate::{ValidationError, ValidationIssue};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned when no order matches the requested id.
pub const ORDER_NOT_FOUND: &str = "Order not found";

/// One located validation problem in an error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetail {
	/// Where the problem is, e.g. `["body", "quantity"]`.
	pub loc: Vec<String>,
	/// Human-readable description.
	pub msg: String,
	/// Issue code.
	#[serde(rename = "type")]
	pub error_type: String,
}

impl IssueDetail {
	/// Locates a validation issue under the given request part (`body`, `path`).
	pub fn from_issue(location: &str, issue: &ValidationIssue) -> Self {
		let mut loc = vec![location.to_string()];
		loc.extend(
			issue
				.field()
				.split('.')
				.filter(|part| !part.is_empty())
				.map(str::to_string),
		);
		Self {
			loc,
			msg: issue.to_string(),
			error_type: issue.kind().to_string(),
		}
	}
}

/// Contents of the `detail` member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
	Message(String),
	Issues(Vec<IssueDetail>),
}

/// API error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub detail: ErrorDetail,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request that could not be read as JSON (400)
	BadRequest { message: String },
	/// Requested resource does not exist (404)
	NotFound { message: String },
	/// Payload or path parameter failed validation (422)
	UnprocessableEntity { issues: Vec<IssueDetail> },
	/// Internal server error (500)
	InternalServerError { message: String },
}

impl APIError {
	/// The 404 returned for any missing order.
	pub fn order_not_found() -> Self {
		APIError::NotFound {
			message: ORDER_NOT_FOUND.to_string(),
		}
	}

	/// Builds a 422 from a validation failure in the given request part.
	pub fn validation(location: &str, error: &ValidationError) -> Self {
		APIError::UnprocessableEntity {
			issues: error
				.issues()
				.iter()
				.map(|issue| IssueDetail::from_issue(location, issue))
				.collect(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> StatusCode {
		match self {
			APIError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			APIError::NotFound { .. } => StatusCode::NOT_FOUND,
			APIError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
			APIError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let detail = match self {
			APIError::BadRequest { message }
			| APIError::NotFound { message }
			| APIError::InternalServerError { message } => ErrorDetail::Message(message.clone()),
			APIError::UnprocessableEntity { issues } => ErrorDetail::Issues(issues.clone()),
		};
		ErrorResponse { detail }
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message } => write!(f, "Bad Request: {}", message),
			APIError::NotFound { message } => write!(f, "Not Found: {}", message),
			APIError::UnprocessableEntity { issues } => {
				write!(f, "Unprocessable Entity: {} issue(s)", issues.len())
			},
			APIError::InternalServerError { message } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}
