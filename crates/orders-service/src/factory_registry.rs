//! Factory registry for storage implementations.
//!
//! Every backend the storage crate ships is registered under its name, and the
//! `[storage]` section of the configuration picks among them at startup.

use orders_config::StorageConfig;
use orders_storage::{StorageError, StorageFactory, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised while turning configuration into an opened store.
#[derive(Debug, Error)]
pub enum BuildError {
	#[error("Unknown storage implementation '{name}'. Available: [{available}]")]
	UnknownImplementation { name: String, available: String },
	#[error("Failed to create storage implementation '{name}': {source}")]
	Create { name: String, source: StorageError },
	#[error("Primary storage '{0}' is not configured")]
	MissingPrimary(String),
	#[error("Failed to open storage: {0}")]
	Open(#[from] StorageError),
}

/// Global registry for storage implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
		}
	}

	/// Register a storage implementation
	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	/// Comma-separated, sorted list of registered storage names.
	pub fn available_storage(&self) -> String {
		let mut names: Vec<_> = self.storage.keys().map(String::as_str).collect();
		names.sort_unstable();
		names.join(", ")
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

// Global registry instance
static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in orders_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		registry
	})
}

/// Get the global registry, initializing it on first use
pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Builds every configured storage implementation and opens the primary one.
///
/// Non-primary sections are constructed too, so a typo in any of them fails
/// startup instead of surfacing when someone switches `primary`.
pub async fn build_storage(config: &StorageConfig) -> Result<StorageService, BuildError> {
	let registry = get_registry();

	let mut names: Vec<_> = config.implementations.keys().collect();
	names.sort_unstable();

	let mut primary: Option<Box<dyn StorageInterface>> = None;
	for name in names {
		let factory = registry.storage.get(name.as_str()).ok_or_else(|| {
			BuildError::UnknownImplementation {
				name: name.clone(),
				available: registry.available_storage(),
			}
		})?;

		let settings = &config.implementations[name];
		let backend = factory(settings).map_err(|source| BuildError::Create {
			name: name.clone(),
			source,
		})?;

		let is_primary = *name == config.primary;
		tracing::info!(
			component = "storage",
			implementation = %name,
			enabled = is_primary,
			"Loaded"
		);
		if is_primary {
			primary = Some(backend);
		}
	}

	let backend = primary.ok_or_else(|| BuildError::MissingPrimary(config.primary.clone()))?;
	Ok(StorageService::open(backend).await?)
}
