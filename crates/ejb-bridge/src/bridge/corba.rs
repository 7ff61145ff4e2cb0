//! CORBA/IIOP wire adapter
//!
//! Requests are bound to a servant through an object key and carry their
//! arguments positionally. Faults are rendered as the matching CORBA system
//! exception: repository id, minor code, completion status and message.
//!
//! Reply layout (integers in the byte order named by the first octet):
//!
//! ```text
//! u8   byte order (0 = big endian, 1 = little endian)
//! u32  request id
//! u32  reply status (0 = NO_EXCEPTION, 2 = SYSTEM_EXCEPTION)
//! ...  result value | repository id, minor, completion status, message
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use super::{InboundCall, WireAdapter};
use crate::marshal::{ParameterDescriptor, WireParameter};
use crate::types::objref::{get_blob, get_string, get_u32, put_blob, put_len, put_u32};
use crate::types::{
    BridgeError, CompletionStatus, InterfaceType, ProxyRole, RemoteException,
    RemoteExceptionKind, RemoteReference, Result, SystemFaultKind, Value, ValueType,
    INTERNAL_MARSHAL_ERROR,
};

pub const REPLY_NO_EXCEPTION: u32 = 0;
pub const REPLY_SYSTEM_EXCEPTION: u32 = 2;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_LONG: u8 = 3;
const TAG_DOUBLE: u8 = 4;
const TAG_STRING: u8 = 5;
const TAG_BYTES: u8 = 6;
const TAG_LIST: u8 = 7;
const TAG_REFERENCE: u8 = 8;

/// Deepest list nesting a reply body may carry
pub const MAX_NESTING: usize = 32;

/// Operation exposed by a servant
#[derive(Clone, Debug)]
pub struct CorbaOperation {
    pub name: String,
    pub method_signature: String,
    pub param_types: Vec<ValueType>,
}

impl CorbaOperation {
    pub fn new(name: impl Into<String>, method_signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method_signature: method_signature.into(),
            param_types: Vec::new(),
        }
    }

    pub fn param(mut self, ty: ValueType) -> Self {
        self.param_types.push(ty);
        self
    }
}

/// Reference-bound request
#[derive(Clone, Debug)]
pub struct CorbaRequest {
    pub request_id: u32,
    pub object_key: Bytes,
    /// Servant the object key resolved to
    pub target: InterfaceType,
    pub operation: String,
    pub arguments: Vec<Value>,
}

impl CorbaRequest {
    pub fn new(
        request_id: u32,
        object_key: impl Into<Bytes>,
        target: InterfaceType,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            object_key: object_key.into(),
            target,
            operation: operation.into(),
            arguments: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.arguments.push(value.into());
        self
    }
}

/// Request header stored on the invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorbaRequestContext {
    pub request_id: u32,
    pub object_key: Bytes,
    pub operation: String,
}

/// System exception body
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemExceptionReply {
    pub repository_id: String,
    pub minor: u32,
    pub completed: CompletionStatus,
    pub message: String,
}

impl SystemExceptionReply {
    pub fn kind(&self) -> Option<SystemFaultKind> {
        SystemFaultKind::from_repository_id(&self.repository_id)
    }

    /// Build the system exception matching a translated failure
    pub fn from_exception(exception: &RemoteException) -> Self {
        if let Some(fault) = exception.system_fault() {
            return Self {
                repository_id: fault.kind.repository_id(),
                minor: fault.minor,
                completed: fault.completed,
                message: fault.message.clone(),
            };
        }

        let (kind, completed) = match exception.kind() {
            RemoteExceptionKind::TransactionRolledBack => {
                (SystemFaultKind::TransactionRolledBack, CompletionStatus::Maybe)
            }
            RemoteExceptionKind::TransactionRequired => {
                (SystemFaultKind::TransactionRequired, CompletionStatus::No)
            }
            RemoteExceptionKind::InvalidTransaction => {
                (SystemFaultKind::InvalidTransaction, CompletionStatus::No)
            }
            RemoteExceptionKind::ObjectNotExist => {
                (SystemFaultKind::ObjectNotExist, CompletionStatus::No)
            }
            RemoteExceptionKind::NoPermission => {
                (SystemFaultKind::NoPermission, CompletionStatus::No)
            }
            // reply marshaling runs after the operation completed
            RemoteExceptionKind::Marshal if exception.detail() == INTERNAL_MARSHAL_ERROR => {
                (SystemFaultKind::Marshal, CompletionStatus::Yes)
            }
            RemoteExceptionKind::Marshal => (SystemFaultKind::Marshal, CompletionStatus::No),
            RemoteExceptionKind::Unknown | RemoteExceptionKind::Other => {
                (SystemFaultKind::Unknown, CompletionStatus::Maybe)
            }
        };

        Self {
            repository_id: kind.repository_id(),
            minor: 0,
            completed,
            message: exception.detail().to_string(),
        }
    }
}

/// Reply body
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyBody {
    NoException(Value),
    SystemException(SystemExceptionReply),
}

/// CORBA reply
#[derive(Clone, Debug, PartialEq)]
pub struct CorbaReply {
    pub request_id: u32,
    pub body: ReplyBody,
}

impl CorbaReply {
    pub fn reply_status(&self) -> u32 {
        match self.body {
            ReplyBody::NoException(_) => REPLY_NO_EXCEPTION,
            ReplyBody::SystemException(_) => REPLY_SYSTEM_EXCEPTION,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.body {
            ReplyBody::NoException(value) => Some(value),
            ReplyBody::SystemException(_) => None,
        }
    }

    pub fn system_exception(&self) -> Option<&SystemExceptionReply> {
        match &self.body {
            ReplyBody::SystemException(ex) => Some(ex),
            ReplyBody::NoException(_) => None,
        }
    }

    /// Encode the reply
    ///
    /// Fails if the result still holds a local proxy.
    pub fn encode(&self, little_endian: bool) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u8(little_endian as u8);
        put_u32(&mut buf, self.request_id, little_endian);
        put_u32(&mut buf, self.reply_status(), little_endian);

        match &self.body {
            ReplyBody::NoException(value) => encode_value(&mut buf, value, little_endian, 0)?,
            ReplyBody::SystemException(ex) => {
                put_blob(&mut buf, ex.repository_id.as_bytes(), little_endian)?;
                put_u32(&mut buf, ex.minor, little_endian);
                put_u32(&mut buf, ex.completed.code(), little_endian);
                put_blob(&mut buf, ex.message.as_bytes(), little_endian)?;
            }
        }

        Ok(buf.freeze())
    }

    pub fn decode(mut data: Bytes) -> Result<Self> {
        ensure(&data, 1)?;
        let little_endian = data.get_u8() != 0;
        let request_id = get_u32(&mut data, little_endian)?;
        let status = get_u32(&mut data, little_endian)?;

        let body = match status {
            REPLY_NO_EXCEPTION => {
                ReplyBody::NoException(decode_value(&mut data, little_endian, 0)?)
            }
            REPLY_SYSTEM_EXCEPTION => {
                let repository_id = get_string(&mut data, little_endian)?;
                let minor = get_u32(&mut data, little_endian)?;
                let code = get_u32(&mut data, little_endian)?;
                let completed = CompletionStatus::from_code(code).ok_or_else(|| {
                    BridgeError::InvalidReference(format!("invalid completion status {}", code))
                })?;
                let message = get_string(&mut data, little_endian)?;
                ReplyBody::SystemException(SystemExceptionReply {
                    repository_id,
                    minor,
                    completed,
                    message,
                })
            }
            other => {
                return Err(BridgeError::InvalidReference(format!(
                    "unsupported reply status {}",
                    other
                )))
            }
        };

        Ok(Self { request_id, body })
    }
}

fn ensure<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(BridgeError::BufferUnderflow {
            needed,
            have: buf.remaining(),
        });
    }
    Ok(())
}

fn encode_value<B: BufMut>(
    buf: &mut B,
    value: &Value,
    little_endian: bool,
    depth: usize,
) -> Result<()> {
    if depth > MAX_NESTING {
        return Err(BridgeError::InvalidReference(format!(
            "values nested deeper than {} levels",
            MAX_NESTING
        )));
    }
    match value {
        Value::Absent | Value::Null => buf.put_u8(TAG_NULL),
        Value::Bool(v) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u8(*v as u8);
        }
        Value::Int(v) => {
            buf.put_u8(TAG_INT);
            if little_endian {
                buf.put_i32_le(*v);
            } else {
                buf.put_i32(*v);
            }
        }
        Value::Long(v) => {
            buf.put_u8(TAG_LONG);
            if little_endian {
                buf.put_i64_le(*v);
            } else {
                buf.put_i64(*v);
            }
        }
        Value::Double(v) => {
            buf.put_u8(TAG_DOUBLE);
            if little_endian {
                buf.put_f64_le(*v);
            } else {
                buf.put_f64(*v);
            }
        }
        Value::String(s) => {
            buf.put_u8(TAG_STRING);
            put_blob(buf, s.as_bytes(), little_endian)?;
        }
        Value::Bytes(b) => {
            buf.put_u8(TAG_BYTES);
            put_blob(buf, b, little_endian)?;
        }
        Value::List(items) => {
            buf.put_u8(TAG_LIST);
            put_len(buf, items.len(), little_endian)?;
            for item in items {
                encode_value(buf, item, little_endian, depth + 1)?;
            }
        }
        Value::Reference(reference) => {
            buf.put_u8(TAG_REFERENCE);
            reference.encode(buf, little_endian)?;
        }
        Value::Adapter(target) => encode_value(buf, target, little_endian, depth + 1)?,
        Value::Proxy(proxy) => {
            return Err(BridgeError::InvalidReference(format!(
                "local {} proxy for container {} cannot be marshaled",
                proxy.interface, proxy.info.container_id
            )))
        }
    }
    Ok(())
}

fn decode_value<B: Buf>(buf: &mut B, little_endian: bool, depth: usize) -> Result<Value> {
    if depth > MAX_NESTING {
        return Err(BridgeError::InvalidReference(format!(
            "values nested deeper than {} levels",
            MAX_NESTING
        )));
    }
    ensure(&*buf, 1)?;
    let value = match buf.get_u8() {
        TAG_NULL => Value::Null,
        TAG_BOOL => {
            ensure(&*buf, 1)?;
            Value::Bool(buf.get_u8() != 0)
        }
        TAG_INT => {
            ensure(&*buf, 4)?;
            Value::Int(if little_endian { buf.get_i32_le() } else { buf.get_i32() })
        }
        TAG_LONG => {
            ensure(&*buf, 8)?;
            Value::Long(if little_endian { buf.get_i64_le() } else { buf.get_i64() })
        }
        TAG_DOUBLE => {
            ensure(&*buf, 8)?;
            Value::Double(if little_endian { buf.get_f64_le() } else { buf.get_f64() })
        }
        TAG_STRING => Value::String(get_string(buf, little_endian)?),
        TAG_BYTES => Value::Bytes(get_blob(buf, little_endian)?),
        TAG_LIST => {
            let count = get_u32(buf, little_endian)? as usize;
            let mut items = Vec::with_capacity(count.min(buf.remaining()));
            for _ in 0..count {
                items.push(decode_value(buf, little_endian, depth + 1)?);
            }
            Value::List(items)
        }
        TAG_REFERENCE => Value::Reference(RemoteReference::decode(buf, little_endian)?),
        tag => {
            return Err(BridgeError::InvalidReference(format!(
                "unknown value tag {}",
                tag
            )))
        }
    };
    Ok(value)
}

/// CORBA adapter for one servant's operations
#[derive(Clone, Debug, Default)]
pub struct CorbaAdapter {
    operations: Arc<HashMap<String, CorbaOperation>>,
}

impl CorbaAdapter {
    pub fn new<I>(operations: I) -> Self
    where
        I: IntoIterator<Item = CorbaOperation>,
    {
        Self {
            operations: Arc::new(
                operations
                    .into_iter()
                    .map(|op| (op.name.clone(), op))
                    .collect(),
            ),
        }
    }

    pub fn operation(&self, name: &str) -> Option<&CorbaOperation> {
        self.operations.get(name)
    }
}

impl WireAdapter for CorbaAdapter {
    type Request = CorbaRequest;
    type Response = CorbaReply;

    fn protocol(&self) -> &'static str {
        "IIOP"
    }

    fn decode(&self, request: &CorbaRequest) -> Result<InboundCall> {
        let operation = self
            .operation(&request.operation)
            .ok_or_else(|| BridgeError::UnknownOperation(request.operation.clone()))?;

        if let Err(interface) = ProxyRole::try_from(request.target) {
            warn!(
                "Request {} targets a {} servant, which is not reachable over IIOP",
                request.request_id, interface
            );
            return Err(BridgeError::UnreachableTarget(interface));
        }

        let parameters = request
            .arguments
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let descriptor = operation
                    .param_types
                    .get(index)
                    .map(|ty| ParameterDescriptor::new().with_type(ty.clone()));
                WireParameter::new(value.clone(), descriptor)
            })
            .collect();

        debug!(
            "Decoded IIOP request {} for {} on {} servant",
            request.request_id, operation.method_signature, request.target
        );

        Ok(InboundCall {
            method_signature: operation.method_signature.clone(),
            interface: request.target,
            parameters,
            expected_count: operation.param_types.len(),
            wire_context: Some(Arc::new(CorbaRequestContext {
                request_id: request.request_id,
                object_key: request.object_key.clone(),
                operation: request.operation.clone(),
            })),
        })
    }

    fn render_result(&self, request: &CorbaRequest, value: Value) -> CorbaReply {
        CorbaReply {
            request_id: request.request_id,
            body: ReplyBody::NoException(value),
        }
    }

    fn render_fault(&self, request: &CorbaRequest, exception: RemoteException) -> CorbaReply {
        let reply = SystemExceptionReply::from_exception(&exception);
        debug!(
            "Request {} raised {} (minor {}, {})",
            request.request_id, reply.repository_id, reply.minor, reply.completed
        );
        CorbaReply {
            request_id: request.request_id,
            body: ReplyBody::SystemException(reply),
        }
    }
}
