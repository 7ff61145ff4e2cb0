//! Protocol-neutral value model
//!
//! Both wire adapters decode their native parameters into [`Value`] and
//! render results from it. Local proxies only ever appear on the server side
//! and must be rewritten to [`RemoteReference`]s before a value leaves the
//! process.

use bytes::Bytes;
use std::fmt;

use super::identifiers::{InterfaceType, ProxyInfo};
use super::objref::RemoteReference;

/// A local proxy object bound to a container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalProxy {
    /// What the proxy points at
    pub info: ProxyInfo,
    /// Which view of the component it exposes
    pub interface: InterfaceType,
}

impl LocalProxy {
    pub fn new(info: ProxyInfo, interface: InterfaceType) -> Self {
        Self { info, interface }
    }

    /// Home proxy for a container
    pub fn home(info: ProxyInfo) -> Self {
        Self::new(info, InterfaceType::Home)
    }

    /// Instance proxy for a container
    pub fn remote(info: ProxyInfo) -> Self {
        Self::new(info, InterfaceType::Remote)
    }
}

/// Wire value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Argument slot not supplied by the caller
    Absent,
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Bytes(Bytes),
    List(Vec<Value>),
    /// Local proxy (server side only)
    Proxy(LocalProxy),
    /// Remoting adapter (tie) wrapping a target
    Adapter(Box<Value>),
    /// Wire-transmissible object reference
    Reference(RemoteReference),
}

impl Value {
    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Proxy(_) => "proxy",
            Value::Adapter(_) => "adapter",
            Value::Reference(_) => "reference",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Whether a local proxy is reachable from this value
    pub fn contains_local_proxy(&self) -> bool {
        match self {
            Value::Proxy(_) => true,
            Value::Adapter(target) => target.contains_local_proxy(),
            Value::List(items) => items.iter().any(Value::contains_local_proxy),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => f.write_str("<absent>"),
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Proxy(p) => write!(f, "<{} proxy {}>", p.interface, p.info),
            Value::Adapter(target) => write!(f, "<adapter {}>", target),
            Value::Reference(r) => f.write_str(&r.to_corbaloc()),
        }
    }
}

/// Declared parameter type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueType {
    /// Accepts any value unchanged
    Any,
    Bool,
    Int,
    Long,
    Double,
    String,
    Bytes,
    List(Box<ValueType>),
}

impl ValueType {
    /// Primitive types have no null representation
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ValueType::Bool | ValueType::Int | ValueType::Long | ValueType::Double
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => f.write_str("any"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int => f.write_str("int"),
            ValueType::Long => f.write_str("long"),
            ValueType::Double => f.write_str("double"),
            ValueType::String => f.write_str("string"),
            ValueType::Bytes => f.write_str("bytes"),
            ValueType::List(inner) => write!(f, "list<{}>", inner),
        }
    }
}
