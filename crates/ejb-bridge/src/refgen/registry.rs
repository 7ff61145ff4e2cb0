//! Reference generator registry
//!
//! Process-wide, read-mostly table keyed by container identity. Generators
//! are registered at deployment time and looked up on every reply that
//! carries a local proxy.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::generator::RefGenerator;
use crate::types::{
    BridgeError, ContainerId, InterfaceType, LocalProxy, ProxyInfo, RemoteReference, Result, Value,
};

/// Registry of reference generators
///
/// Lookups take a shared read lock and clone the generator handle out, so
/// concurrent readers never wait on one another and no lock is held while
/// a generator runs.
pub struct RefGeneratorRegistry {
    generators: RwLock<HashMap<ContainerId, Arc<dyn RefGenerator>>>,
}

impl RefGeneratorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            generators: RwLock::new(HashMap::new()),
        }
    }

    /// Register a generator; fails if one is already registered
    pub fn register(&self, id: ContainerId, generator: Arc<dyn RefGenerator>) -> Result<()> {
        let mut generators = self.generators.write();
        if generators.contains_key(&id) {
            warn!("Duplicate reference generator registration for container {}", id);
            return Err(BridgeError::DuplicateGenerator(id));
        }
        info!("Registering reference generator for container {}", id);
        generators.insert(id, generator);
        Ok(())
    }

    /// Explicitly re-register, returning the previous generator
    pub fn replace(
        &self,
        id: ContainerId,
        generator: Arc<dyn RefGenerator>,
    ) -> Option<Arc<dyn RefGenerator>> {
        info!("Replacing reference generator for container {}", id);
        self.generators.write().insert(id, generator)
    }

    /// Remove the generator for a container
    pub fn unregister(&self, id: &ContainerId) -> Option<Arc<dyn RefGenerator>> {
        let removed = self.generators.write().remove(id);
        if removed.is_some() {
            info!("Unregistered reference generator for container {}", id);
        }
        removed
    }

    /// Look up the generator for a container
    pub fn lookup(&self, id: &ContainerId) -> Option<Arc<dyn RefGenerator>> {
        self.generators.read().get(id).cloned()
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.generators.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.generators.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.read().is_empty()
    }

    /// All registered container IDs
    pub fn container_ids(&self) -> Vec<ContainerId> {
        self.generators.read().keys().cloned().collect()
    }

    /// Drop every registration (teardown)
    pub fn clear(&self) {
        let mut generators = self.generators.write();
        debug!("Clearing {} reference generators", generators.len());
        generators.clear();
    }

    /// Generate a reference for a proxy of the given interface type
    pub fn generate_reference(
        &self,
        info: &ProxyInfo,
        interface: InterfaceType,
    ) -> Result<RemoteReference> {
        let generator = self.lookup(&info.container_id).ok_or_else(|| {
            BridgeError::ReferenceGeneration {
                container: info.container_id.clone(),
                interface,
                reason: "no reference generator registered".to_string(),
            }
        })?;

        let role = info.role_for(interface).inspect_err(|_| {
            error!(
                "Encountered unknown local invocation handler of type {}: {}",
                interface, info
            );
        })?;

        let generated = catch_unwind(AssertUnwindSafe(|| generator.reference(role, info)))
            .unwrap_or_else(|_| {
                Err(BridgeError::ReferenceGeneration {
                    container: info.container_id.clone(),
                    interface,
                    reason: "generator panicked".to_string(),
                })
            });

        generated.map_err(|e| match e {
            e @ BridgeError::ReferenceGeneration { .. } => e,
            other => BridgeError::ReferenceGeneration {
                container: info.container_id.clone(),
                interface,
                reason: other.to_string(),
            },
        })
    }

    /// Replace every local proxy reachable from `value` with a remote reference
    ///
    /// Remoting adapters whose target is a local proxy are unwrapped; lists
    /// are rewritten element by element.
    pub fn rewrite(&self, value: Value) -> Result<Value> {
        match value {
            Value::Proxy(LocalProxy { info, interface }) => {
                let reference = self.generate_reference(&info, interface)?;
                debug!(
                    "Rewrote {} proxy for container {} to {}",
                    interface,
                    info.container_id,
                    reference.to_corbaloc()
                );
                Ok(Value::Reference(reference))
            }
            Value::Adapter(target) => match *target {
                proxy @ Value::Proxy(_) => self.rewrite(proxy),
                other => Ok(Value::Adapter(Box::new(self.rewrite(other)?))),
            },
            Value::List(items) => items
                .into_iter()
                .map(|item| self.rewrite(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            other => Ok(other),
        }
    }
}

impl Default for RefGeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
