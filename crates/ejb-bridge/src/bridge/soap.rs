//! SOAP/RPC wire adapter
//!
//! Parameters arrive as named elements and are matched to the operation's
//! parameter descriptors by name. Every failure is rendered as the same
//! generic `Server` fault; the translated cause stays attached to the fault
//! value and is logged, but is only written to the envelope when fault
//! detail masking is turned off.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use super::{BridgeConfig, InboundCall, WireAdapter};
use crate::marshal::{ParameterDescriptor, WireParameter};
use crate::types::{BridgeError, InterfaceType, RemoteException, Result, Value, ValueType};

pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Fault code of every fault the adapter renders
pub const SERVER_FAULT_CODE: &str = "Server";
/// Fault string of every fault the adapter renders
pub const SERVER_FAULT_STRING: &str = "Server Error";

/// Operation entry of a service description
#[derive(Clone, Debug)]
pub struct OperationDesc {
    pub name: String,
    /// Container method signature the operation dispatches to
    pub method_signature: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type: Option<ValueType>,
}

impl OperationDesc {
    pub fn new(name: impl Into<String>, method_signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method_signature: method_signature.into(),
            parameters: Vec::new(),
            return_type: None,
        }
    }

    /// Append a named parameter at the next declared position
    pub fn param(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        let order = self.parameters.len();
        self.parameters
            .push(ParameterDescriptor::named(name).with_type(ty).with_order(order));
        self
    }

    /// Append a caller-built descriptor as is
    pub fn with_parameter(mut self, descriptor: ParameterDescriptor) -> Self {
        self.parameters.push(descriptor);
        self
    }

    pub fn returns(mut self, ty: ValueType) -> Self {
        self.return_type = Some(ty);
        self
    }

    fn descriptor(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|d| d.name.as_deref() == Some(name))
    }
}

/// Service description
#[derive(Clone, Debug)]
pub struct ServiceDesc {
    pub name: String,
    pub namespace: String,
    operations: HashMap<String, OperationDesc>,
}

impl ServiceDesc {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            operations: HashMap::new(),
        }
    }

    pub fn with_operation(mut self, operation: OperationDesc) -> Self {
        self.operations.insert(operation.name.clone(), operation);
        self
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDesc> {
        self.operations.get(name)
    }
}

/// Named parameter element
#[derive(Clone, Debug, PartialEq)]
pub struct SoapParam {
    pub name: String,
    pub value: Value,
}

/// Decoded SOAP/RPC request body
#[derive(Clone, Debug)]
pub struct SoapRequest {
    pub operation: String,
    pub params: Vec<SoapParam>,
    pub soap_action: Option<String>,
}

impl SoapRequest {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: Vec::new(),
            soap_action: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push(SoapParam {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_soap_action(mut self, action: impl Into<String>) -> Self {
        self.soap_action = Some(action.into());
        self
    }
}

/// Message context stored on the invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoapMessageContext {
    pub service: String,
    pub operation: String,
    pub soap_action: Option<String>,
}

/// Successful response body
#[derive(Clone, Debug, PartialEq)]
pub struct SoapBody {
    pub namespace: String,
    pub operation: String,
    pub return_value: Value,
}

/// Generic server-error fault
#[derive(Error, Clone, Debug)]
#[error("{fault_code}: {fault_string}")]
pub struct SoapFault {
    pub fault_code: String,
    pub fault_string: String,
    /// Written to the envelope only when detail masking is off
    pub detail: Option<String>,
    #[source]
    cause: RemoteException,
}

impl SoapFault {
    /// The translated failure behind this fault
    pub fn cause(&self) -> &RemoteException {
        &self.cause
    }
}

/// SOAP response
#[derive(Clone, Debug)]
pub enum SoapResponse {
    Body(SoapBody),
    Fault(SoapFault),
}

impl SoapResponse {
    pub fn is_fault(&self) -> bool {
        matches!(self, SoapResponse::Fault(_))
    }

    pub fn as_body(&self) -> Option<&SoapBody> {
        match self {
            SoapResponse::Body(body) => Some(body),
            SoapResponse::Fault(_) => None,
        }
    }

    pub fn as_fault(&self) -> Option<&SoapFault> {
        match self {
            SoapResponse::Fault(fault) => Some(fault),
            SoapResponse::Body(_) => None,
        }
    }

    /// Render the response envelope
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "<soapenv:Envelope xmlns:soapenv=\"{}\" xmlns:xsi=\"{}\"><soapenv:Body>",
            SOAP_ENVELOPE_NS, XSI_NS
        );
        match self {
            SoapResponse::Body(body) => {
                let _ = write!(
                    out,
                    "<ns:{op}Response xmlns:ns=\"{ns}\">",
                    op = escape(&body.operation),
                    ns = escape(&body.namespace)
                );
                write_element(&mut out, "return", &body.return_value);
                let _ = write!(out, "</ns:{}Response>", escape(&body.operation));
            }
            SoapResponse::Fault(fault) => {
                let _ = write!(
                    out,
                    "<soapenv:Fault><faultcode>soapenv:{}</faultcode><faultstring>{}</faultstring>",
                    escape(&fault.fault_code),
                    escape(&fault.fault_string)
                );
                if let Some(detail) = &fault.detail {
                    let _ = write!(out, "<detail>{}</detail>", escape(detail));
                }
                out.push_str("</soapenv:Fault>");
            }
        }
        out.push_str("</soapenv:Body></soapenv:Envelope>");
        out
    }
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null | Value::Absent => {
            let _ = write!(out, "<{} xsi:nil=\"true\"/>", name);
        }
        Value::List(items) => {
            let _ = write!(out, "<{}>", name);
            for item in items {
                write_element(out, "item", item);
            }
            let _ = write!(out, "</{}>", name);
        }
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            let _ = write!(out, "<{0}>{1}</{0}>", name, hex);
        }
        Value::Adapter(target) => write_element(out, name, target),
        other => {
            let _ = write!(out, "<{0}>{1}</{0}>", name, escape(&other.to_string()));
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// SOAP/RPC adapter for one service
#[derive(Clone, Debug)]
pub struct SoapAdapter {
    service: Arc<ServiceDesc>,
    mask_fault_detail: bool,
}

impl SoapAdapter {
    /// Create an adapter that masks fault detail
    pub fn new(service: ServiceDesc) -> Self {
        Self {
            service: Arc::new(service),
            mask_fault_detail: true,
        }
    }

    pub fn from_config(service: ServiceDesc, config: &BridgeConfig) -> Self {
        Self::new(service).with_masked_detail(config.mask_soap_fault_detail)
    }

    pub fn with_masked_detail(mut self, mask: bool) -> Self {
        self.mask_fault_detail = mask;
        self
    }

    pub fn service(&self) -> &ServiceDesc {
        &self.service
    }
}

impl WireAdapter for SoapAdapter {
    type Request = SoapRequest;
    type Response = SoapResponse;

    fn protocol(&self) -> &'static str {
        "SOAP"
    }

    fn decode(&self, request: &SoapRequest) -> Result<InboundCall> {
        let operation = self
            .service
            .operation(&request.operation)
            .ok_or_else(|| BridgeError::UnknownOperation(request.operation.clone()))?;

        let parameters = request
            .params
            .iter()
            .map(|param| {
                WireParameter::new(param.value.clone(), operation.descriptor(&param.name).cloned())
            })
            .collect();

        debug!(
            "Decoded SOAP operation {} -> {}",
            operation.name, operation.method_signature
        );

        Ok(InboundCall {
            method_signature: operation.method_signature.clone(),
            interface: InterfaceType::WebService,
            parameters,
            expected_count: operation.parameters.len(),
            wire_context: Some(Arc::new(SoapMessageContext {
                service: self.service.name.clone(),
                operation: request.operation.clone(),
                soap_action: request.soap_action.clone(),
            })),
        })
    }

    fn render_result(&self, request: &SoapRequest, value: Value) -> SoapResponse {
        SoapResponse::Body(SoapBody {
            namespace: self.service.namespace.clone(),
            operation: request.operation.clone(),
            return_value: value,
        })
    }

    fn render_fault(&self, request: &SoapRequest, exception: RemoteException) -> SoapResponse {
        error!(
            "Web service invocation of {}.{} failed: {} (cause: {})",
            self.service.name,
            request.operation,
            exception,
            exception.cause()
        );
        let detail = (!self.mask_fault_detail).then(|| exception.to_string());
        SoapResponse::Fault(SoapFault {
            fault_code: SERVER_FAULT_CODE.to_string(),
            fault_string: SERVER_FAULT_STRING.to_string(),
            detail,
            cause: exception,
        })
    }
}
