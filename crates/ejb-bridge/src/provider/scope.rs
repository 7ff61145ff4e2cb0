//! Scoped bootstrap override

use tracing::debug;

use super::{
    namespaced_property, PortRefMetadata, ProviderRegistry, ProviderSources, WrappingProvider,
    PROVIDER_PROPERTY, WRAPPER_IMPLEMENTATION,
};
use crate::types::Result;

/// Overlay installed on the provider sources for one bootstrap call
///
/// While the scope lives:
/// - the wrapping provider is the first service entry
/// - the standard property names the wrapping provider, and the value it
///   held before moves to the namespaced property
///
/// Everything is put back when the scope is dropped, whether the lookup
/// succeeded, failed or panicked.
pub struct BootstrapScope<'a> {
    registry: &'a ProviderRegistry,
    sources: &'a mut ProviderSources,
    port_refs: Vec<PortRefMetadata>,
    // previous values of overridden properties
    saved_standard: Option<Option<String>>,
    saved_namespaced: Option<Option<String>>,
}

impl<'a> BootstrapScope<'a> {
    pub fn acquire(
        registry: &'a ProviderRegistry,
        sources: &'a mut ProviderSources,
        port_refs: Vec<PortRefMetadata>,
    ) -> Self {
        let mut saved_standard = None;
        let mut saved_namespaced = None;

        if let Some(old) = sources.property(PROVIDER_PROPERTY).map(str::to_string) {
            if old != WRAPPER_IMPLEMENTATION {
                saved_namespaced = Some(sources.properties.insert(namespaced_property(), old));
                saved_standard = Some(sources.properties.insert(
                    PROVIDER_PROPERTY.to_string(),
                    WRAPPER_IMPLEMENTATION.to_string(),
                ));
            }
        }
        sources
            .service_entries
            .insert(0, WRAPPER_IMPLEMENTATION.to_string());

        debug!(
            "Acquired bootstrap scope with {} port refs",
            port_refs.len()
        );
        Self {
            registry,
            sources,
            port_refs,
            saved_standard,
            saved_namespaced,
        }
    }

    /// Sources as seen inside the scope
    pub fn sources(&self) -> &ProviderSources {
        &*self.sources
    }

    pub fn port_refs(&self) -> &[PortRefMetadata] {
        &self.port_refs
    }

    /// Resolve the wrapping provider for this bootstrap
    pub fn provider(&self) -> Result<WrappingProvider> {
        WrappingProvider::resolve(self.registry, &*self.sources, self.port_refs.clone())
    }
}

fn restore(sources: &mut ProviderSources, key: String, previous: Option<String>) {
    match previous {
        Some(value) => {
            sources.properties.insert(key, value);
        }
        None => {
            sources.properties.remove(&key);
        }
    }
}

impl Drop for BootstrapScope<'_> {
    fn drop(&mut self) {
        if self.sources.service_entries.first().map(String::as_str) == Some(WRAPPER_IMPLEMENTATION) {
            self.sources.service_entries.remove(0);
        }
        if let Some(previous) = self.saved_standard.take() {
            restore(&mut *self.sources, PROVIDER_PROPERTY.to_string(), previous);
        }
        if let Some(previous) = self.saved_namespaced.take() {
            restore(&mut *self.sources, namespaced_property(), previous);
        }
        debug!("Released bootstrap scope");
    }
}

/// Run one client bootstrap inside a [`BootstrapScope`]
pub fn bootstrap<T, F>(
    registry: &ProviderRegistry,
    sources: &mut ProviderSources,
    port_refs: Vec<PortRefMetadata>,
    lookup: F,
) -> Result<T>
where
    F: FnOnce(&BootstrapScope<'_>) -> Result<T>,
{
    let scope = BootstrapScope::acquire(registry, sources, port_refs);
    lookup(&scope)
}
