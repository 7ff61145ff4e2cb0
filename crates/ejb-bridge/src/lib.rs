//! Remote-invocation bridge for a component container
//!
//! This crate accepts calls expressed in a wire protocol's native form (a
//! SOAP/RPC body or a reference-bound CORBA request), turns them into a
//! protocol-neutral invocation, hands that to the container and renders the
//! value or fault back in the caller's wire form.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        SOAP adapter          │         CORBA adapter        │
//! │  - named parameter elements  │  - positional arguments      │
//! │  - generic Server fault      │  - system exception replies  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  Invocation bridge (this crate)             │
//! │  Argument marshaler │ Invocation record │ Exception         │
//! │  - declared order   │  - pivot rule     │ translator        │
//! │  - coercion         │  - attributes     │  - fixed table    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Reference generator registry   │  Provider resolution      │
//! │  (proxy -> remote reference)    │  (client bootstrap)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │             Container dispatcher (external)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! - **Invocation**: one inbound call; owned by the task serving it
//! - **Pivot**: the point after which the response is fixed and the
//!   invocation can no longer be rebound or re-dispatched
//! - **Local proxy**: in-process handle to a home or instance; must be
//!   rewritten to a **remote reference** before it leaves the process
//! - **Demarcation**: container- or bean-managed transactions
//!
//! # Modules
//!
//! - [`types`]: Core data types and the crate error
//! - [`marshal`]: Wire parameters to ordered arguments
//! - [`translate`]: System faults to remote exceptions
//! - [`refgen`]: Reference generators and their registry
//! - [`invocation`]: The invocation record and its lifecycle
//! - [`bridge`]: The bridge and its SOAP and CORBA adapters
//! - [`provider`]: Client-side binding provider resolution

pub mod types;
pub mod marshal;
pub mod translate;
pub mod refgen;
pub mod invocation;
pub mod bridge;
pub mod provider;

// Re-export main types
pub use types::{
    BridgeError, Result, DispatchError,
    ContainerId, InterfaceType, ProxyInfo, ProxyRole,
    TransactionDemarcation, Value, ValueType, LocalProxy, RemoteReference,
    SystemFault, SystemFaultKind, CompletionStatus, RemoteException, RemoteExceptionKind,
};
pub use marshal::{demarshal, ArgumentMarshaler, ParameterDescriptor, SlotCollisionPolicy, WireParameter};
pub use translate::{ExceptionTranslator, FaultFallback, GenericFallback};
pub use refgen::{RefGenerator, RefGeneratorRegistry, StandardRefGenerator};
pub use invocation::{Invocation, InvocationKey, InvocationState, Outcome};
pub use bridge::{
    BridgeConfig, ContainerDispatcher, DeploymentInfo, InboundCall, InvocationBridge,
    MethodTable, WireAdapter,
};
pub use provider::{bootstrap, find_provider, BootstrapScope, ProviderRegistry, ProviderSources};
