//! Deployment and proxy identifiers
//!
//! - ContainerId: stable key of a deployed component
//! - InterfaceType: which view of a component a proxy or servant exposes
//! - ProxyRole: the two views that have a remote reference form
//! - ProxyInfo: what a local proxy knows about its target

use bytes::Bytes;
use std::fmt;

use super::error::{BridgeError, Result};

/// Generate a fresh random object key
pub fn generate_object_key() -> Bytes {
    Bytes::copy_from_slice(uuid::Uuid::new_v4().as_bytes())
}

/// Container identity
///
/// Opaque, stable identifier for a deployed component. Used as the lookup
/// key into the reference generator registry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(String);

impl ContainerId {
    /// Create a new container ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Debug for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerId({})", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interface type of a proxy, servant or invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    /// Remote home (factory) interface
    Home,
    /// Remote component interface
    Remote,
    /// In-process home interface
    LocalHome,
    /// In-process component interface
    Local,
    /// Web service endpoint
    WebService,
}

impl InterfaceType {
    /// Name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            InterfaceType::Home => "home",
            InterfaceType::Remote => "remote",
            InterfaceType::LocalHome => "local-home",
            InterfaceType::Local => "local",
            InterfaceType::WebService => "web-service",
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role of a proxy crossing a process boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProxyRole {
    /// Home (factory) endpoint
    Home,
    /// Remote (instance) endpoint
    Remote,
}

impl ProxyRole {
    /// Wire flag for this role
    pub fn flag(&self) -> u32 {
        match self {
            ProxyRole::Home => 1,
            ProxyRole::Remote => 2,
        }
    }

    /// Parse a wire flag
    pub fn from_flag(flag: u32) -> Option<Self> {
        match flag {
            1 => Some(ProxyRole::Home),
            2 => Some(ProxyRole::Remote),
            _ => None,
        }
    }
}

impl From<ProxyRole> for InterfaceType {
    fn from(role: ProxyRole) -> Self {
        match role {
            ProxyRole::Home => InterfaceType::Home,
            ProxyRole::Remote => InterfaceType::Remote,
        }
    }
}

impl TryFrom<InterfaceType> for ProxyRole {
    type Error = InterfaceType;

    fn try_from(interface: InterfaceType) -> std::result::Result<Self, Self::Error> {
        match interface {
            InterfaceType::Home => Ok(ProxyRole::Home),
            InterfaceType::Remote => Ok(ProxyRole::Remote),
            other => Err(other),
        }
    }
}

/// Proxy information
///
/// Carried by every local proxy and servant; identifies the container it is
/// bound to and, for instance proxies, the primary key of the target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyInfo {
    /// Container the proxy is bound to
    pub container_id: ContainerId,
    /// Home interface name
    pub home_interface: Option<String>,
    /// Remote interface name
    pub remote_interface: Option<String>,
    /// Serialized primary key of the target instance
    pub primary_key: Option<Bytes>,
}

impl ProxyInfo {
    /// Create proxy info for a container
    pub fn new(container_id: impl Into<ContainerId>) -> Self {
        Self {
            container_id: container_id.into(),
            home_interface: None,
            remote_interface: None,
            primary_key: None,
        }
    }

    /// Set the home interface name
    pub fn with_home_interface(mut self, name: impl Into<String>) -> Self {
        self.home_interface = Some(name.into());
        self
    }

    /// Set the remote interface name
    pub fn with_remote_interface(mut self, name: impl Into<String>) -> Self {
        self.remote_interface = Some(name.into());
        self
    }

    /// Set the primary key
    pub fn with_primary_key(mut self, key: impl Into<Bytes>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    /// Resolve the reference role for an interface type
    pub fn role_for(&self, interface: InterfaceType) -> Result<ProxyRole> {
        ProxyRole::try_from(interface).map_err(|other| BridgeError::ReferenceGeneration {
            container: self.container_id.clone(),
            interface: other,
            reason: "unknown local invocation handler type".to_string(),
        })
    }
}

impl fmt::Display for ProxyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container={}", self.container_id)?;
        if let Some(home) = &self.home_interface {
            write!(f, " home={}", home)?;
        }
        if let Some(remote) = &self.remote_interface {
            write!(f, " remote={}", remote)?;
        }
        Ok(())
    }
}
