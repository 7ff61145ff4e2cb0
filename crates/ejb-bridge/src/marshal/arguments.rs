//! Argument demarshaling
//!
//! Converts a wire parameter sequence into the fixed-size argument array of
//! the target method, honoring each parameter's declared order.

use tracing::{trace, warn};

use super::coerce::coerce;
use crate::types::{BridgeError, Result, Value, ValueType};

/// Declared position of a parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ParamOrder {
    /// Explicit slot in the argument array
    Declared(usize),
    /// Use the parameter's position in the incoming sequence
    #[default]
    Unordered,
}

impl ParamOrder {
    /// Convert a raw wire order, where any negative value means unordered
    pub fn from_raw(order: i32) -> Self {
        usize::try_from(order)
            .map(ParamOrder::Declared)
            .unwrap_or(ParamOrder::Unordered)
    }
}

/// Parameter descriptor
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ParameterDescriptor {
    /// Element name on the wire, when the protocol names parameters
    pub name: Option<String>,
    /// Declared host type
    pub declared_type: Option<ValueType>,
    /// Declared order
    pub order: ParamOrder,
}

impl ParameterDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, ty: ValueType) -> Self {
        self.declared_type = Some(ty);
        self
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = ParamOrder::Declared(order);
        self
    }

    pub fn with_raw_order(mut self, order: i32) -> Self {
        self.order = ParamOrder::from_raw(order);
        self
    }
}

/// A parameter as it arrived on the wire
#[derive(Clone, Debug, PartialEq)]
pub struct WireParameter {
    pub value: Value,
    pub descriptor: Option<ParameterDescriptor>,
}

impl WireParameter {
    pub fn new(value: impl Into<Value>, descriptor: Option<ParameterDescriptor>) -> Self {
        Self {
            value: value.into(),
            descriptor,
        }
    }

    /// Parameter without a descriptor
    pub fn bare(value: impl Into<Value>) -> Self {
        Self::new(value, None)
    }

    pub fn described(value: impl Into<Value>, descriptor: ParameterDescriptor) -> Self {
        Self::new(value, Some(descriptor))
    }
}

/// What to do when two parameters resolve to the same slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SlotCollisionPolicy {
    /// Fail with `ArgumentSlotCollision`
    #[default]
    Reject,
    /// Later parameter wins (legacy behavior)
    Overwrite,
}

/// Argument marshaler
#[derive(Clone, Copy, Debug, Default)]
pub struct ArgumentMarshaler {
    policy: SlotCollisionPolicy,
}

impl ArgumentMarshaler {
    pub fn new(policy: SlotCollisionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SlotCollisionPolicy {
        self.policy
    }

    /// Build the ordered argument array
    ///
    /// The result always has `expected` slots; slots no parameter claimed
    /// hold [`Value::Absent`].
    pub fn demarshal(&self, parameters: Vec<WireParameter>, expected: usize) -> Result<Vec<Value>> {
        let mut args = vec![Value::Absent; expected];
        let mut owners: Vec<Option<usize>> = vec![None; expected];

        for (index, param) in parameters.into_iter().enumerate() {
            let WireParameter { value, descriptor } = param;

            let value = match descriptor.as_ref().and_then(|d| d.declared_type.as_ref()) {
                Some(ty) => coerce(value, ty).map_err(|found| BridgeError::ArgumentCoercion {
                    index,
                    expected: ty.clone(),
                    found,
                })?,
                None => value,
            };

            let slot = match descriptor.as_ref().map(|d| d.order) {
                Some(ParamOrder::Declared(order)) => order,
                _ => index,
            };
            if slot >= expected {
                return Err(BridgeError::ArgumentSlotOutOfRange { slot, expected });
            }

            if let Some(first) = owners[slot] {
                match self.policy {
                    SlotCollisionPolicy::Reject => {
                        return Err(BridgeError::ArgumentSlotCollision {
                            slot,
                            first,
                            second: index,
                        });
                    }
                    SlotCollisionPolicy::Overwrite => {
                        warn!(
                            "Parameter {} overwrites slot {} already bound by parameter {}",
                            index, slot, first
                        );
                    }
                }
            }

            trace!("Parameter {} bound to slot {}", index, slot);
            owners[slot] = Some(index);
            args[slot] = value;
        }

        Ok(args)
    }
}

/// Demarshal with the default (rejecting) collision policy
pub fn demarshal(parameters: Vec<WireParameter>, expected: usize) -> Result<Vec<Value>> {
    ArgumentMarshaler::default().demarshal(parameters, expected)
}
