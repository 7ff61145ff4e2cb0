//! Reference generators
//!
//! A generator turns the proxy information of one deployed container into
//! wire-transmissible references. Home references are stable for the life of
//! the generator; instance references are keyed by primary key when the
//! proxy has one.

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::{
    generate_object_key, BridgeError, ContainerId, InterfaceType, ProxyInfo, ProxyRole,
    RemoteReference, Result,
};

/// Object key prefix of home references
pub const HOME_KEY_PREFIX: &[u8] = b"home/";
/// Object key prefix of instance references
pub const OBJECT_KEY_PREFIX: &[u8] = b"object/";

/// Builds remote references for one container
pub trait RefGenerator: Send + Sync {
    /// Reference to the container's home
    fn home_reference(&self, info: &ProxyInfo) -> Result<RemoteReference>;

    /// Reference to a component instance
    fn object_reference(&self, info: &ProxyInfo) -> Result<RemoteReference>;

    /// Dispatch on role
    fn reference(&self, role: ProxyRole, info: &ProxyInfo) -> Result<RemoteReference> {
        match role {
            ProxyRole::Home => self.home_reference(info),
            ProxyRole::Remote => self.object_reference(info),
        }
    }
}

/// Generator backed by a fixed endpoint
///
/// Mirrors what an object adapter does for a deployed container: one home
/// object key per container, instance keys derived from the primary key.
#[derive(Clone, Debug)]
pub struct StandardRefGenerator {
    container_id: ContainerId,
    endpoint: String,
    home_key: Bytes,
}

impl StandardRefGenerator {
    /// Create a generator for a container reachable at `endpoint`
    pub fn new(container_id: impl Into<ContainerId>, endpoint: impl Into<String>) -> Self {
        let container_id = container_id.into();
        let home_key = prefixed_key(HOME_KEY_PREFIX, container_id.as_str().as_bytes());
        Self {
            container_id,
            endpoint: endpoint.into(),
            home_key,
        }
    }

    pub fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn check_container(&self, info: &ProxyInfo, role: ProxyRole) -> Result<()> {
        if info.container_id != self.container_id {
            return Err(BridgeError::ReferenceGeneration {
                container: info.container_id.clone(),
                interface: InterfaceType::from(role),
                reason: format!("generator is bound to container {}", self.container_id),
            });
        }
        Ok(())
    }

    fn type_id(&self, interface: Option<&str>, role: ProxyRole) -> String {
        match interface {
            Some(name) => format!("RMI:{}:0000000000000000", name),
            None => {
                let suffix = match role {
                    ProxyRole::Home => "Home",
                    ProxyRole::Remote => "Object",
                };
                format!("IDL:{}/{}:1.0", self.container_id, suffix)
            }
        }
    }
}

impl RefGenerator for StandardRefGenerator {
    fn home_reference(&self, info: &ProxyInfo) -> Result<RemoteReference> {
        self.check_container(info, ProxyRole::Home)?;
        Ok(RemoteReference::new(
            self.type_id(info.home_interface.as_deref(), ProxyRole::Home),
            self.container_id.clone(),
            ProxyRole::Home,
            self.endpoint.clone(),
            self.home_key.clone(),
        ))
    }

    fn object_reference(&self, info: &ProxyInfo) -> Result<RemoteReference> {
        self.check_container(info, ProxyRole::Remote)?;
        let identity = match &info.primary_key {
            Some(pk) => pk.clone(),
            None => generate_object_key(),
        };
        let mut key = BytesMut::with_capacity(
            OBJECT_KEY_PREFIX.len() + self.container_id.as_str().len() + 1 + identity.len(),
        );
        key.put_slice(OBJECT_KEY_PREFIX);
        key.put_slice(self.container_id.as_str().as_bytes());
        key.put_u8(b'/');
        key.put_slice(&identity);

        Ok(RemoteReference::new(
            self.type_id(info.remote_interface.as_deref(), ProxyRole::Remote),
            self.container_id.clone(),
            ProxyRole::Remote,
            self.endpoint.clone(),
            key.freeze(),
        ))
    }
}

fn prefixed_key(prefix: &[u8], body: &[u8]) -> Bytes {
    let mut key = BytesMut::with_capacity(prefix.len() + body.len());
    key.put_slice(prefix);
    key.put_slice(body);
    key.freeze()
}
