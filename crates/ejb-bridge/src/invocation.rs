//! Protocol-neutral invocation record
//!
//! One `Invocation` is created per inbound call and owned by the task
//! serving that call. It moves through
//!
//! ```text
//! Received -> ArgumentsBound -> Dispatched -> ResultReady -> Committed
//!     |             |               |             |
//!     +-------------+---------------+-------------+--> FaultReady -> Committed
//! ```
//!
//! Entering `ResultReady` or `FaultReady` puts the invocation past pivot:
//! from then on nothing may rebind arguments, re-dispatch or touch its
//! attributes, and the outcome recorded there is the one response the call
//! produces. The only transition allowed past pivot besides commit is
//! `ResultReady -> FaultReady`, taken when the reply itself cannot be
//! marshaled.
//!
//! Only the bridge reaches the pivot. Containers see the invocation during
//! dispatch but can neither record an outcome nor commit it.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{
    BridgeError, ContainerId, InterfaceType, RemoteException, Result, TransactionDemarcation,
    Value,
};

/// Attribute value stored on an invocation
pub type Attribute = Arc<dyn Any + Send + Sync>;

/// Keys of the invocation attribute map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvocationKey {
    /// Raw context of the wire request (SOAP message context, CORBA request header)
    WireContext,
    /// Transaction context propagated by the caller
    TransactionContext,
    /// Authenticated caller identity
    CallerIdentity,
}

/// Invocation lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationState {
    Received,
    ArgumentsBound,
    Dispatched,
    ResultReady,
    FaultReady,
    Committed,
}

impl InvocationState {
    pub fn name(&self) -> &'static str {
        match self {
            InvocationState::Received => "Received",
            InvocationState::ArgumentsBound => "ArgumentsBound",
            InvocationState::Dispatched => "Dispatched",
            InvocationState::ResultReady => "ResultReady",
            InvocationState::FaultReady => "FaultReady",
            InvocationState::Committed => "Committed",
        }
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Response recorded at pivot
#[derive(Clone, Debug)]
pub enum Outcome {
    Result(Value),
    Fault(RemoteException),
}

impl Outcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::Fault(_))
    }

    pub fn as_result(&self) -> Option<&Value> {
        match self {
            Outcome::Result(v) => Some(v),
            Outcome::Fault(_) => None,
        }
    }

    pub fn as_fault(&self) -> Option<&RemoteException> {
        match self {
            Outcome::Fault(ex) => Some(ex),
            Outcome::Result(_) => None,
        }
    }
}

/// A single inbound method call crossing into the container
pub struct Invocation {
    method_index: usize,
    interface: InterfaceType,
    demarcation: TransactionDemarcation,
    arguments: Vec<Value>,
    attributes: HashMap<InvocationKey, Attribute>,
    container: Option<ContainerId>,
    instance_context: Option<Attribute>,
    state: InvocationState,
    past_pivot: bool,
    outcome: Option<Outcome>,
}

impl Invocation {
    /// Create an invocation in the `Received` state
    pub fn new(
        method_index: usize,
        interface: InterfaceType,
        demarcation: TransactionDemarcation,
    ) -> Self {
        Self {
            method_index,
            interface,
            demarcation,
            arguments: Vec::new(),
            attributes: HashMap::new(),
            container: None,
            instance_context: None,
            state: InvocationState::Received,
            past_pivot: false,
            outcome: None,
        }
    }

    /// Index of the target method in the container's method table
    pub fn method_index(&self) -> usize {
        self.method_index
    }

    pub fn interface(&self) -> InterfaceType {
        self.interface
    }

    pub fn demarcation(&self) -> TransactionDemarcation {
        self.demarcation
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn is_past_pivot(&self) -> bool {
        self.past_pivot
    }

    /// Response recorded at pivot, if any
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn container(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    pub fn instance_context(&self) -> Option<&Attribute> {
        self.instance_context.as_ref()
    }

    pub fn get(&self, key: InvocationKey) -> Option<&Attribute> {
        self.attributes.get(&key)
    }

    /// Typed attribute access
    pub fn get_as<T: Any + Send + Sync>(&self, key: InvocationKey) -> Option<&T> {
        self.attributes.get(&key).and_then(|a| a.downcast_ref::<T>())
    }

    pub fn put(&mut self, key: InvocationKey, value: Attribute) -> Result<Option<Attribute>> {
        self.ensure_before_pivot()?;
        Ok(self.attributes.insert(key, value))
    }

    /// Bind the container identity (set by the dispatcher)
    pub fn bind_container(&mut self, id: ContainerId) -> Result<()> {
        self.ensure_before_pivot()?;
        self.container = Some(id);
        Ok(())
    }

    /// Bind the instance context (set by the dispatcher once an instance is chosen)
    pub fn set_instance_context(&mut self, context: Attribute) -> Result<()> {
        self.ensure_before_pivot()?;
        self.instance_context = Some(context);
        Ok(())
    }

    /// Received -> ArgumentsBound
    pub fn bind_arguments(&mut self, arguments: Vec<Value>) -> Result<()> {
        self.transition(&[InvocationState::Received], InvocationState::ArgumentsBound)?;
        self.arguments = arguments;
        Ok(())
    }

    /// ArgumentsBound -> Dispatched
    pub fn begin_dispatch(&mut self) -> Result<()> {
        self.transition(&[InvocationState::ArgumentsBound], InvocationState::Dispatched)
    }

    /// Dispatched -> ResultReady (pivot)
    ///
    /// `marshal` prepares the value for the reply. If it fails the
    /// invocation moves on to `FaultReady` with the returned exception.
    pub(crate) fn begin_result<F>(&mut self, value: Value, marshal: F) -> Result<&Outcome>
    where
        F: FnOnce(Value) -> std::result::Result<Value, RemoteException>,
    {
        self.transition(&[InvocationState::Dispatched], InvocationState::ResultReady)?;
        self.past_pivot = true;

        let outcome = match marshal(value) {
            Ok(value) => Outcome::Result(value),
            Err(ex) => {
                self.state = InvocationState::FaultReady;
                Outcome::Fault(ex)
            }
        };
        Ok(&*self.outcome.insert(outcome))
    }

    /// Any pre-pivot state -> FaultReady (pivot)
    pub(crate) fn begin_fault(&mut self, exception: RemoteException) -> Result<&Outcome> {
        self.transition(
            &[
                InvocationState::Received,
                InvocationState::ArgumentsBound,
                InvocationState::Dispatched,
            ],
            InvocationState::FaultReady,
        )?;
        self.past_pivot = true;
        Ok(&*self.outcome.insert(Outcome::Fault(exception)))
    }

    /// ResultReady | FaultReady -> Committed
    pub(crate) fn commit(&mut self) -> Result<&Outcome> {
        if !matches!(
            self.state,
            InvocationState::ResultReady | InvocationState::FaultReady
        ) {
            return Err(BridgeError::InvalidTransition {
                from: self.state.name(),
                to: InvocationState::Committed.name(),
            });
        }
        let outcome = self.outcome.as_ref().ok_or(BridgeError::InvalidTransition {
            from: self.state.name(),
            to: InvocationState::Committed.name(),
        })?;
        self.state = InvocationState::Committed;
        Ok(outcome)
    }

    fn ensure_before_pivot(&self) -> Result<()> {
        if self.past_pivot {
            return Err(BridgeError::PastPivot(self.state.name()));
        }
        Ok(())
    }

    fn transition(&mut self, from: &[InvocationState], to: InvocationState) -> Result<()> {
        self.ensure_before_pivot()?;
        if !from.contains(&self.state) {
            return Err(BridgeError::InvalidTransition {
                from: self.state.name(),
                to: to.name(),
            });
        }
        self.state = to;
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("method_index", &self.method_index)
            .field("interface", &self.interface)
            .field("demarcation", &self.demarcation)
            .field("arguments", &self.arguments)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("container", &self.container)
            .field("state", &self.state)
            .field("past_pivot", &self.past_pivot)
            .field("outcome", &self.outcome)
            .finish()
    }
}
