//! API endpoint implementations for the orders service.

pub mod order;
