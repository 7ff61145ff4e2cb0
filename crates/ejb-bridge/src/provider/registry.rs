//! Closed provider plugin table

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use super::BindingProvider;
use crate::types::{BridgeError, Result};

/// Constructor of a provider implementation
pub type ProviderFactory = Arc<dyn Fn() -> Result<Arc<dyn BindingProvider>> + Send + Sync>;

/// Map from implementation name to constructor
///
/// Built once at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an implementation
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn BindingProvider>> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registering binding provider {}", name);
        self.factories.insert(name, Arc::new(factory));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_provider<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn BindingProvider>> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the named implementation
    pub fn instantiate(&self, name: &str) -> Result<Arc<dyn BindingProvider>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| BridgeError::ProviderConstruction {
                implementation: name.to_string(),
                reason: "not a registered implementation".to_string(),
            })?;

        catch_unwind(AssertUnwindSafe(|| factory())).unwrap_or_else(|_| {
            Err(BridgeError::ProviderConstruction {
                implementation: name.to_string(),
                reason: "factory panicked".to_string(),
            })
        })
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("names", &self.names())
            .finish()
    }
}
