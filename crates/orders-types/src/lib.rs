//! Common types module for the orders service.
//!
//! This module defines the order entity, the request payloads accepted by the
//! HTTP API and the error shapes returned by it. It also carries the small
//! schema framework used by storage backends to validate their TOML sections.

/// API types for HTTP error responses.
pub mod api;
/// Order entity, response shape and change sets.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// TOML configuration schema validation.
pub mod schema;
/// Payload parsing and validation for order requests.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use schema::*;
pub use validation::*;
