//! Plugin-based lookup registry
//!
//! The registry allows ISP lookup implementations to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use starprobe_core::registry::LookupRegistry;
//! use starprobe_core::config::LookupConfig;
//!
//! // Create a registry
//! let registry = LookupRegistry::new();
//!
//! // Register lookups (each lookup crate exposes a `register()` function)
//! starprobe_lookup_http::register(&registry);
//!
//! // Create a lookup from config
//! let lookup = registry.create_lookup(&LookupConfig::default())?;
//! ```

use crate::config::LookupConfig;
use crate::error::{Error, Result};
use crate::traits::{IspLookup, IspLookupFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Lookup registry for plugin-based lookup creation
///
/// Maps lookup type names to factory objects.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct LookupRegistry {
    /// Registered lookup factories
    lookups: RwLock<HashMap<String, Box<dyn IspLookupFactory>>>,
}

impl LookupRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lookup factory
    ///
    /// # Parameters
    ///
    /// - `name`: Lookup type name (e.g., "ip_api")
    /// - `factory`: Factory object for creating lookup instances
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use starprobe_core::registry::LookupRegistry;
    /// # use starprobe_core::traits::IspLookupFactory;
    /// # struct MyFactory;
    /// # impl IspLookupFactory for MyFactory {
    /// #     fn create(&self, config: &starprobe_core::config::LookupConfig) -> starprobe_core::Result<Box<dyn starprobe_core::IspLookup>> { unimplemented!() }
    /// # }
    /// let registry = LookupRegistry::new();
    /// registry.register_lookup("mylookup", Box::new(MyFactory));
    /// ```
    pub fn register_lookup(&self, name: impl Into<String>, factory: Box<dyn IspLookupFactory>) {
        let name = name.into();
        let mut lookups = self.lookups.write().unwrap_or_else(PoisonError::into_inner);
        lookups.insert(name, factory);
    }

    /// Create a lookup from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn IspLookup>)`: Created lookup instance
    /// - `Err(Error)`: If the lookup type is not registered or creation fails
    pub fn create_lookup(&self, config: &LookupConfig) -> Result<Box<dyn IspLookup>> {
        let lookup_type = config.type_name();
        let lookups = self.lookups.read().unwrap_or_else(PoisonError::into_inner);

        let factory = lookups
            .get(lookup_type)
            .ok_or_else(|| Error::config(format!("Unknown lookup type: {}", lookup_type)))?;

        factory.create(config)
    }

    /// List all registered lookup types
    pub fn list_lookups(&self) -> Vec<String> {
        let lookups = self.lookups.read().unwrap_or_else(PoisonError::into_inner);
        lookups.keys().cloned().collect()
    }

    /// Check if a lookup type is registered
    pub fn has_lookup(&self, name: &str) -> bool {
        let lookups = self.lookups.read().unwrap_or_else(PoisonError::into_inner);
        lookups.contains_key(name)
    }
}
