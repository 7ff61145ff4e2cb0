//! Invocation bridge
//!
//! Drives one inbound call from a wire adapter through the container and
//! back:
//!
//! ```text
//! wire request --decode--> InboundCall --demarshal--> Invocation
//!     --dispatch--> value | failure --rewrite/translate--> Outcome
//!     --render--> wire response
//! ```
//!
//! Every call that reaches [`InvocationBridge::handle`] produces exactly one
//! response. The outcome is fixed at pivot and nothing that runs after it
//! can replace it.

mod config;
pub mod corba;
mod dispatcher;
pub mod soap;

pub use config::*;
pub use dispatcher::*;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::invocation::{Attribute, Invocation, InvocationKey, Outcome};
use crate::marshal::{ArgumentMarshaler, WireParameter};
use crate::refgen::{RefGenerator, RefGeneratorRegistry, StandardRefGenerator};
use crate::translate::ExceptionTranslator;
use crate::types::{BridgeError, ContainerId, InterfaceType, RemoteException, Result, Value};

/// Protocol-neutral view of a decoded wire request
#[derive(Debug)]
pub struct InboundCall {
    /// Signature used to look up the container method index
    pub method_signature: String,
    /// View of the component the call targets
    pub interface: InterfaceType,
    pub parameters: Vec<WireParameter>,
    /// Declared parameter count of the target operation
    pub expected_count: usize,
    /// Raw wire context, stored on the invocation under [`InvocationKey::WireContext`]
    pub wire_context: Option<Attribute>,
}

/// A wire protocol front-end
pub trait WireAdapter: Send + Sync {
    type Request: Send + Sync;
    type Response: Send;

    /// Protocol name for logs
    fn protocol(&self) -> &'static str;

    /// Decode a request into the protocol-neutral call
    fn decode(&self, request: &Self::Request) -> Result<InboundCall>;

    /// Render a successful (already rewritten) result
    fn render_result(&self, request: &Self::Request, value: Value) -> Self::Response;

    /// Render a translated failure
    fn render_fault(&self, request: &Self::Request, exception: RemoteException) -> Self::Response;
}

/// Bridge statistics
#[derive(Debug, Default)]
pub struct BridgeStats {
    pub requests_received: AtomicU64,
    pub requests_succeeded: AtomicU64,
    pub requests_faulted: AtomicU64,
}

impl BridgeStats {
    pub fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_faulted: self.requests_faulted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of bridge statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStatsSnapshot {
    pub requests_received: u64,
    pub requests_succeeded: u64,
    pub requests_faulted: u64,
}

/// Invocation bridge for one deployed component
///
/// The bridge is shared across request tasks; each call owns its own
/// [`Invocation`].
pub struct InvocationBridge {
    deployment: DeploymentInfo,
    dispatcher: Arc<dyn ContainerDispatcher>,
    registry: Arc<RefGeneratorRegistry>,
    translator: ExceptionTranslator,
    marshaler: ArgumentMarshaler,
    config: BridgeConfig,
    stats: Arc<BridgeStats>,
}

impl InvocationBridge {
    pub fn new(
        deployment: DeploymentInfo,
        dispatcher: Arc<dyn ContainerDispatcher>,
        registry: Arc<RefGeneratorRegistry>,
    ) -> Self {
        Self::with_config(deployment, dispatcher, registry, BridgeConfig::default())
    }

    pub fn with_config(
        deployment: DeploymentInfo,
        dispatcher: Arc<dyn ContainerDispatcher>,
        registry: Arc<RefGeneratorRegistry>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            deployment,
            dispatcher,
            registry,
            translator: ExceptionTranslator::new(),
            marshaler: ArgumentMarshaler::new(config.slot_collision),
            config,
            stats: Arc::new(BridgeStats::default()),
        }
    }

    /// Replace the exception translator
    pub fn with_translator(mut self, translator: ExceptionTranslator) -> Self {
        self.translator = translator;
        self
    }

    pub fn deployment(&self) -> &DeploymentInfo {
        &self.deployment
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<RefGeneratorRegistry> {
        &self.registry
    }

    pub fn translator(&self) -> &ExceptionTranslator {
        &self.translator
    }

    /// Get bridge statistics
    pub fn stats(&self) -> &Arc<BridgeStats> {
        &self.stats
    }

    /// Register a reference generator for a container
    pub fn register_reference_generator(
        &self,
        id: ContainerId,
        generator: Arc<dyn RefGenerator>,
    ) -> Result<()> {
        self.registry.register(id, generator)
    }

    /// Register the standard generator for this bridge's own container
    pub fn deploy_standard_generator(&self) -> Result<()> {
        let id = self.deployment.container_id.clone();
        let generator = StandardRefGenerator::new(id.clone(), self.config.endpoint.clone());
        self.registry.register(id, Arc::new(generator))
    }

    /// Serve one wire request
    pub async fn handle<A: WireAdapter>(&self, adapter: &A, request: A::Request) -> A::Response {
        self.stats.requests_received.fetch_add(1, Ordering::Relaxed);

        let outcome = match adapter.decode(&request) {
            Ok(call) => self.invoke(call).await,
            Err(e) => {
                warn!("Rejected {} request: {}", adapter.protocol(), e);
                Outcome::Fault(self.translator.translate_error(e))
            }
        };

        match outcome {
            Outcome::Result(value) => {
                self.stats.requests_succeeded.fetch_add(1, Ordering::Relaxed);
                adapter.render_result(&request, value)
            }
            Outcome::Fault(exception) => {
                self.stats.requests_faulted.fetch_add(1, Ordering::Relaxed);
                debug!("{} call faulted: {}", adapter.protocol(), exception);
                adapter.render_fault(&request, exception)
            }
        }
    }

    /// Run a decoded call through the container
    pub async fn invoke(&self, call: InboundCall) -> Outcome {
        let Some(method_index) = self.dispatcher.method_index_for(&call.method_signature) else {
            warn!(
                "No method {} on container {}",
                call.method_signature, self.deployment.container_id
            );
            let err = BridgeError::UnknownOperation(call.method_signature);
            return Outcome::Fault(self.translator.translate_error(err));
        };

        let mut invocation =
            Invocation::new(method_index, call.interface, self.deployment.demarcation);
        match self.run(&mut invocation, call).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Invocation of method {} aborted: {}", method_index, e);
                match invocation.outcome() {
                    Some(Outcome::Result(value)) => match self.registry.rewrite(value.clone()) {
                        Ok(value) => Outcome::Result(value),
                        Err(e) => Outcome::Fault(self.translator.translate_error(e)),
                    },
                    Some(fault) => fault.clone(),
                    None => Outcome::Fault(self.translator.translate_error(e)),
                }
            }
        }
    }

    async fn run(&self, invocation: &mut Invocation, call: InboundCall) -> Result<Outcome> {
        invocation.bind_container(self.deployment.container_id.clone())?;
        if let Some(context) = call.wire_context {
            invocation.put(InvocationKey::WireContext, context)?;
        }
        self.execute(invocation, call.parameters, call.expected_count)
            .await
    }

    /// Bind arguments, dispatch and settle a `Received` invocation
    ///
    /// Failures of the call itself come back as `Outcome::Fault`. `Err` is
    /// reserved for misuse of the invocation, such as executing one that is
    /// already past pivot.
    pub async fn execute(
        &self,
        invocation: &mut Invocation,
        parameters: Vec<WireParameter>,
        expected: usize,
    ) -> Result<Outcome> {
        if invocation.is_past_pivot() {
            return Err(BridgeError::PastPivot(invocation.state().name()));
        }

        match self.marshaler.demarshal(parameters, expected) {
            Ok(arguments) => invocation.bind_arguments(arguments)?,
            Err(e) => {
                debug!("Argument demarshaling failed: {}", e);
                invocation.begin_fault(self.translator.translate_error(e))?;
                return invocation.commit().cloned();
            }
        }

        match self.dispatch(invocation).await {
            Ok(value) => {
                let registry = &self.registry;
                let translator = &self.translator;
                invocation.begin_result(value, |value| {
                    registry
                        .rewrite(value)
                        .map_err(|e| translator.translate_error(e))
                })?;
            }
            Err(e) if e.is_programming_error() => return Err(e),
            Err(e) => {
                invocation.begin_fault(self.translator.translate_error(e))?;
            }
        }

        invocation.commit().cloned()
    }

    /// Hand an `ArgumentsBound` invocation to the container
    ///
    /// Fails with [`BridgeError::PastPivot`] once the invocation has an outcome.
    pub async fn dispatch(&self, invocation: &mut Invocation) -> Result<Value> {
        invocation.begin_dispatch()?;
        debug!(
            "Dispatching method {} ({}) on container {}",
            invocation.method_index(),
            invocation.interface(),
            self.deployment.container_id
        );

        let dispatched = AssertUnwindSafe(self.dispatcher.dispatch(invocation))
            .catch_unwind()
            .await;
        match dispatched {
            Ok(result) => result.map_err(BridgeError::Dispatch),
            Err(_) => {
                error!(
                    "Container dispatcher panicked on container {}",
                    self.deployment.container_id
                );
                Err(BridgeError::Dispatch("container dispatcher panicked".into()))
            }
        }
    }
}

impl std::fmt::Debug for InvocationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationBridge")
            .field("deployment", &self.deployment)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for InvocationBridge {
    fn drop(&mut self) {
        let stats = self.stats.snapshot();
        info!(
            "Bridge for container {} closed: {} received, {} succeeded, {} faulted",
            self.deployment.container_id,
            stats.requests_received,
            stats.requests_succeeded,
            stats.requests_faulted
        );
    }
}
