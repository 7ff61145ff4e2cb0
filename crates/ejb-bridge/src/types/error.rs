//! Bridge error types

use thiserror::Error;

use super::identifiers::{ContainerId, InterfaceType};
use super::value::ValueType;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Opaque failure raised by the container dispatcher
pub type DispatchError = Box<dyn std::error::Error + Send + Sync>;

/// Bridge-specific errors
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A wire value could not be coerced to its declared type
    #[error("cannot coerce argument {index} to {expected}: {found}")]
    ArgumentCoercion {
        index: usize,
        expected: ValueType,
        found: String,
    },

    /// Two incoming parameters resolved to the same argument slot
    #[error("argument slot {slot} claimed by parameters {first} and {second}")]
    ArgumentSlotCollision {
        slot: usize,
        first: usize,
        second: usize,
    },

    /// A parameter resolved to a slot past the declared parameter count
    #[error("argument slot {slot} out of range for {expected} declared parameters")]
    ArgumentSlotOutOfRange { slot: usize, expected: usize },

    /// The container dispatcher raised a failure
    #[error("dispatch failed: {0}")]
    Dispatch(#[source] DispatchError),

    /// No generator for the container, or the interface type has no reference form
    #[error("reference generation failed for container {container} ({interface}): {reason}")]
    ReferenceGeneration {
        container: ContainerId,
        interface: InterfaceType,
        reason: String,
    },

    /// A generator is already registered for this container
    #[error("reference generator already registered for container {0}")]
    DuplicateGenerator(ContainerId),

    /// No binding provider could be resolved
    #[error("configuration failure: {0}")]
    Configuration(String),

    /// A binding provider factory refused to construct an instance
    #[error("unable to construct provider implementation {implementation}: {reason}")]
    ProviderConstruction {
        implementation: String,
        reason: String,
    },

    /// Unrecognized transaction demarcation name
    #[error("invalid demarcation type: {0}")]
    InvalidDemarcationName(String),

    /// The invocation is past pivot and can no longer be mutated
    #[error("invocation is past pivot (state {0})")]
    PastPivot(&'static str),

    /// Illegal invocation state transition
    #[error("invalid invocation transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// The container has no method for the requested operation
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Malformed remote reference
    #[error("invalid remote reference: {0}")]
    InvalidReference(String),

    /// The wire request addresses a servant this protocol cannot reach
    #[error("no {0} servant is reachable over this protocol")]
    UnreachableTarget(InterfaceType),

    /// A length does not fit the u32 wire prefix
    #[error("length {0} exceeds the wire length limit")]
    LengthOverflow(usize),

    /// Buffer underflow (not enough data)
    #[error("buffer underflow: need {needed} bytes, have {have}")]
    BufferUnderflow { needed: usize, have: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether this error indicates misuse of the invocation state machine
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            BridgeError::PastPivot(_) | BridgeError::InvalidTransition { .. }
        )
    }

    /// Whether this error arose while binding or marshaling values
    pub fn is_marshaling_error(&self) -> bool {
        matches!(
            self,
            BridgeError::ArgumentCoercion { .. }
                | BridgeError::ArgumentSlotCollision { .. }
                | BridgeError::ArgumentSlotOutOfRange { .. }
                | BridgeError::ReferenceGeneration { .. }
                | BridgeError::UnreachableTarget(_)
                | BridgeError::LengthOverflow(_)
                | BridgeError::InvalidReference(_)
                | BridgeError::BufferUnderflow { .. }
        )
    }
}
