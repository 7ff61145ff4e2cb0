//! Client-side binding provider resolution
//!
//! A client service lookup needs a concrete binding implementation. The
//! implementation name is searched for, in order, in
//!
//! 1. the namespaced override property (`bridge.` + [`PROVIDER_PROPERTY`])
//! 2. the service registry entries
//! 3. the runtime properties file
//! 4. the standard override property
//!
//! and instantiated from the closed [`ProviderRegistry`] plugin table. Names
//! are never loaded dynamically: a name the table does not know is treated
//! like a class that failed to load.
//!
//! During a bootstrap call a [`BootstrapScope`] puts the wrapping provider in
//! front of every source, so a client stack that consults the registry before
//! the override property still ends up with the wrapper. The wrapper itself
//! resolves the real delegate, skipping its own name.

mod registry;
mod scope;
mod sources;
mod wrapper;

pub use registry::*;
pub use scope::*;
pub use sources::*;
pub use wrapper::*;

use std::collections::HashMap;
use std::fmt;

use crate::types::Result;

/// Standard override property naming the provider implementation
pub const PROVIDER_PROPERTY: &str = "binding.spi.Provider";

/// Prefix of the namespaced override property
pub const NAMESPACE_PREFIX: &str = "bridge.";

/// Registry name of the wrapping provider
pub const WRAPPER_IMPLEMENTATION: &str = "bridge.WrappingProvider";

/// Namespaced override property (`bridge.binding.spi.Provider`)
pub fn namespaced_property() -> String {
    format!("{}{}", NAMESPACE_PREFIX, PROVIDER_PROPERTY)
}

/// Protocol binding of a port
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Soap11,
    Soap12,
    Http,
}

impl BindingKind {
    pub fn is_soap(&self) -> bool {
        matches!(self, BindingKind::Soap11 | BindingKind::Soap12)
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Soap11 => f.write_str("SOAP 1.1"),
            BindingKind::Soap12 => f.write_str("SOAP 1.2"),
            BindingKind::Http => f.write_str("HTTP"),
        }
    }
}

/// Client-side port created by a provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    pub service_endpoint_interface: String,
    pub binding: BindingKind,
    pub mtom_enabled: bool,
    pub request_context: HashMap<String, String>,
}

impl Port {
    pub fn new(service_endpoint_interface: impl Into<String>, binding: BindingKind) -> Self {
        Self {
            service_endpoint_interface: service_endpoint_interface.into(),
            binding,
            mtom_enabled: false,
            request_context: HashMap::new(),
        }
    }
}

/// Per-interface port configuration from the client deployment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortRefMetadata {
    pub service_endpoint_interface: String,
    pub enable_mtom: bool,
    pub properties: HashMap<String, String>,
}

impl PortRefMetadata {
    pub fn new(service_endpoint_interface: impl Into<String>) -> Self {
        Self {
            service_endpoint_interface: service_endpoint_interface.into(),
            ..Self::default()
        }
    }

    pub fn with_mtom(mut self, enable: bool) -> Self {
        self.enable_mtom = enable;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// Binding implementation
pub trait BindingProvider: Send + Sync {
    /// Registry name of this implementation
    fn implementation(&self) -> &str;

    /// Create a client port for a service endpoint interface
    fn create_port(&self, service_endpoint_interface: &str, binding: BindingKind) -> Result<Port>;
}
