//! Wrapping provider

use std::sync::Arc;

use tracing::debug;

use super::{
    find_provider, BindingKind, BindingProvider, Port, PortRefMetadata, ProviderRegistry,
    ProviderSources, WRAPPER_IMPLEMENTATION,
};
use crate::types::Result;

/// Provider that delegates to the resolved implementation and applies
/// port-ref metadata to every port it hands out
pub struct WrappingProvider {
    delegate_name: String,
    delegate: Arc<dyn BindingProvider>,
    port_refs: Vec<PortRefMetadata>,
}

impl WrappingProvider {
    /// Resolve the delegate from the sources
    pub fn resolve(
        registry: &ProviderRegistry,
        sources: &ProviderSources,
        port_refs: Vec<PortRefMetadata>,
    ) -> Result<Self> {
        let (delegate_name, delegate) = find_provider(registry, sources)?;
        Ok(Self::new(delegate_name, delegate, port_refs))
    }

    pub fn new(
        delegate_name: impl Into<String>,
        delegate: Arc<dyn BindingProvider>,
        port_refs: Vec<PortRefMetadata>,
    ) -> Self {
        Self {
            delegate_name: delegate_name.into(),
            delegate,
            port_refs,
        }
    }

    pub fn delegate(&self) -> &Arc<dyn BindingProvider> {
        &self.delegate
    }

    pub fn delegate_name(&self) -> &str {
        &self.delegate_name
    }

    fn apply_port_refs(&self, port: &mut Port) {
        let Some(port_ref) = self
            .port_refs
            .iter()
            .find(|r| r.service_endpoint_interface == port.service_endpoint_interface)
        else {
            return;
        };

        // MTOM only exists on SOAP bindings
        if port_ref.enable_mtom && port.binding.is_soap() {
            port.mtom_enabled = true;
        }
        port.request_context.extend(
            port_ref
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        debug!(
            "Applied port ref to {} ({} properties)",
            port.service_endpoint_interface,
            port_ref.properties.len()
        );
    }
}

impl BindingProvider for WrappingProvider {
    fn implementation(&self) -> &str {
        WRAPPER_IMPLEMENTATION
    }

    fn create_port(&self, service_endpoint_interface: &str, binding: BindingKind) -> Result<Port> {
        let mut port = self.delegate.create_port(service_endpoint_interface, binding)?;
        self.apply_port_refs(&mut port);
        Ok(port)
    }
}

impl std::fmt::Debug for WrappingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappingProvider")
            .field("delegate", &self.delegate_name)
            .field("port_refs", &self.port_refs)
            .finish()
    }
}
