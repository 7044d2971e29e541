//! Registry trait for self-registering implementations.
//!
//! Every storage backend exposes a `Registry` type implementing this trait so
//! the service can map a configuration name to a factory function.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. `"sqlite"` for `[storage.implementations.sqlite]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
