//! System faults and caller-facing remote exceptions
//!
//! A [`SystemFault`] is what the underlying object system raises; a
//! [`RemoteException`] is what the caller sees after translation. The
//! remote exception always keeps the original failure as its cause.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Detail used for every failure raised while marshaling a reply
pub const INTERNAL_MARSHAL_ERROR: &str = "Internal server error while marshaling the reply";

/// Shared, inspectable failure cause
pub type FaultCause = Arc<dyn StdError + Send + Sync>;

/// Whether the target operation ran before the fault was raised
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompletionStatus {
    Yes,
    No,
    Maybe,
}

impl CompletionStatus {
    /// CORBA wire value
    pub fn code(&self) -> u32 {
        match self {
            CompletionStatus::Yes => 0,
            CompletionStatus::No => 1,
            CompletionStatus::Maybe => 2,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(CompletionStatus::Yes),
            1 => Some(CompletionStatus::No),
            2 => Some(CompletionStatus::Maybe),
            _ => None,
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionStatus::Yes => f.write_str("COMPLETED_YES"),
            CompletionStatus::No => f.write_str("COMPLETED_NO"),
            CompletionStatus::Maybe => f.write_str("COMPLETED_MAYBE"),
        }
    }
}

/// Low-level system fault kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemFaultKind {
    TransactionRolledBack,
    TransactionRequired,
    InvalidTransaction,
    ObjectNotExist,
    NoPermission,
    Marshal,
    Unknown,
    BadParam,
    BadOperation,
    CommFailure,
    Internal,
    NoImplement,
    NoResources,
    Transient,
}

impl SystemFaultKind {
    /// Every kind, in declaration order
    pub const ALL: [SystemFaultKind; 14] = [
        SystemFaultKind::TransactionRolledBack,
        SystemFaultKind::TransactionRequired,
        SystemFaultKind::InvalidTransaction,
        SystemFaultKind::ObjectNotExist,
        SystemFaultKind::NoPermission,
        SystemFaultKind::Marshal,
        SystemFaultKind::Unknown,
        SystemFaultKind::BadParam,
        SystemFaultKind::BadOperation,
        SystemFaultKind::CommFailure,
        SystemFaultKind::Internal,
        SystemFaultKind::NoImplement,
        SystemFaultKind::NoResources,
        SystemFaultKind::Transient,
    ];

    /// CORBA exception name
    pub fn corba_name(&self) -> &'static str {
        match self {
            SystemFaultKind::TransactionRolledBack => "TRANSACTION_ROLLEDBACK",
            SystemFaultKind::TransactionRequired => "TRANSACTION_REQUIRED",
            SystemFaultKind::InvalidTransaction => "INVALID_TRANSACTION",
            SystemFaultKind::ObjectNotExist => "OBJECT_NOT_EXIST",
            SystemFaultKind::NoPermission => "NO_PERMISSION",
            SystemFaultKind::Marshal => "MARSHAL",
            SystemFaultKind::Unknown => "UNKNOWN",
            SystemFaultKind::BadParam => "BAD_PARAM",
            SystemFaultKind::BadOperation => "BAD_OPERATION",
            SystemFaultKind::CommFailure => "COMM_FAILURE",
            SystemFaultKind::Internal => "INTERNAL",
            SystemFaultKind::NoImplement => "NO_IMPLEMENT",
            SystemFaultKind::NoResources => "NO_RESOURCES",
            SystemFaultKind::Transient => "TRANSIENT",
        }
    }

    /// CORBA repository ID
    pub fn repository_id(&self) -> String {
        format!("IDL:omg.org/CORBA/{}:1.0", self.corba_name())
    }

    /// Look up a kind by repository ID
    pub fn from_repository_id(id: &str) -> Option<Self> {
        let name = id.strip_prefix("IDL:omg.org/CORBA/")?.strip_suffix(":1.0")?;
        Self::ALL.into_iter().find(|k| k.corba_name() == name)
    }
}

impl fmt::Display for SystemFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.corba_name())
    }
}

/// Low-level failure raised by the object or transport system
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{kind}: {message} (minor {minor}, {completed})")]
pub struct SystemFault {
    pub kind: SystemFaultKind,
    pub minor: u32,
    pub completed: CompletionStatus,
    pub message: String,
}

impl SystemFault {
    /// Create a fault with minor code 0 and unknown completion
    pub fn new(kind: SystemFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            minor: 0,
            completed: CompletionStatus::Maybe,
            message: message.into(),
        }
    }

    pub fn with_minor(mut self, minor: u32) -> Self {
        self.minor = minor;
        self
    }

    pub fn with_completion(mut self, completed: CompletionStatus) -> Self {
        self.completed = completed;
        self
    }

    /// MARSHAL fault raised after the target operation has completed
    pub fn reply_marshal() -> Self {
        Self::new(SystemFaultKind::Marshal, INTERNAL_MARSHAL_ERROR)
            .with_completion(CompletionStatus::Yes)
    }
}

/// Caller-facing failure classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteExceptionKind {
    TransactionRolledBack,
    TransactionRequired,
    InvalidTransaction,
    ObjectNotExist,
    NoPermission,
    Marshal,
    Unknown,
    Other,
}

impl RemoteExceptionKind {
    pub fn name(&self) -> &'static str {
        match self {
            RemoteExceptionKind::TransactionRolledBack => "TransactionRolledBack",
            RemoteExceptionKind::TransactionRequired => "TransactionRequired",
            RemoteExceptionKind::InvalidTransaction => "InvalidTransaction",
            RemoteExceptionKind::ObjectNotExist => "ObjectNotExist",
            RemoteExceptionKind::NoPermission => "NoPermission",
            RemoteExceptionKind::Marshal => "Marshal",
            RemoteExceptionKind::Unknown => "Unknown",
            RemoteExceptionKind::Other => "Other",
        }
    }
}

impl fmt::Display for RemoteExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Translated failure, ready for a wire adapter to render
#[derive(Clone, Debug)]
pub struct RemoteException {
    kind: RemoteExceptionKind,
    detail: String,
    cause: FaultCause,
}

impl RemoteException {
    pub fn new(kind: RemoteExceptionKind, detail: impl Into<String>, cause: FaultCause) -> Self {
        Self {
            kind,
            detail: detail.into(),
            cause,
        }
    }

    /// Marshal failure raised while building a reply
    pub fn reply_marshal(cause: FaultCause) -> Self {
        Self::new(RemoteExceptionKind::Marshal, INTERNAL_MARSHAL_ERROR, cause)
    }

    pub fn kind(&self) -> RemoteExceptionKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// The original failure
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.cause
    }

    /// Shared handle to the original failure
    pub fn cause_handle(&self) -> FaultCause {
        Arc::clone(&self.cause)
    }

    /// The original failure, if it was a system fault
    pub fn system_fault(&self) -> Option<&SystemFault> {
        self.cause.downcast_ref::<SystemFault>()
    }
}

impl fmt::Display for RemoteException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl StdError for RemoteException {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.cause)
    }
}
