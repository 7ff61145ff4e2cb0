//! Bridge configuration

use crate::marshal::SlotCollisionPolicy;
use crate::types::{ContainerId, TransactionDemarcation};

/// Default advertised endpoint for generated references
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:4201";

/// Bridge configuration
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Handling of two parameters claiming the same argument slot
    pub slot_collision: SlotCollisionPolicy,
    /// Keep internal failure detail out of SOAP fault bodies
    pub mask_soap_fault_detail: bool,
    /// Endpoint stamped into references built by the standard generator
    pub endpoint: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            slot_collision: SlotCollisionPolicy::Reject,
            mask_soap_fault_detail: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Create a configuration advertising `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::new()
    }
}

/// Builder for bridge configuration
#[derive(Clone, Debug, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot_collision(mut self, policy: SlotCollisionPolicy) -> Self {
        self.config.slot_collision = policy;
        self
    }

    pub fn mask_soap_fault_detail(mut self, mask: bool) -> Self {
        self.config.mask_soap_fault_detail = mask;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

/// The deployed component a bridge fronts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentInfo {
    pub container_id: ContainerId,
    pub demarcation: TransactionDemarcation,
}

impl DeploymentInfo {
    pub fn new(container_id: impl Into<ContainerId>, demarcation: TransactionDemarcation) -> Self {
        Self {
            container_id: container_id.into(),
            demarcation,
        }
    }

    /// Container-managed deployment
    pub fn container_managed(container_id: impl Into<ContainerId>) -> Self {
        Self::new(container_id, TransactionDemarcation::CONTAINER)
    }
}
