//! System fault to remote exception translation
//!
//! The mapping table is fixed:
//!
//! | System fault            | Remote exception        |
//! |-------------------------|-------------------------|
//! | TRANSACTION_ROLLEDBACK  | TransactionRolledBack   |
//! | TRANSACTION_REQUIRED    | TransactionRequired     |
//! | INVALID_TRANSACTION     | InvalidTransaction      |
//! | OBJECT_NOT_EXIST        | ObjectNotExist          |
//! | NO_PERMISSION           | NoPermission            |
//! | MARSHAL                 | Marshal                 |
//! | UNKNOWN                 | Unknown                 |
//!
//! Every other fault goes to the configured [`FaultFallback`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use crate::types::{
    BridgeError, DispatchError, FaultCause, RemoteException, RemoteExceptionKind, SystemFault,
    SystemFaultKind,
};

/// Translation for faults outside the fixed table
pub trait FaultFallback: Send + Sync {
    /// Map a system fault the table does not cover
    fn map_system_fault(&self, fault: &SystemFault, cause: FaultCause) -> RemoteException;

    /// Wrap a failure that is not a system fault at all
    fn wrap_failure(&self, cause: FaultCause) -> RemoteException;
}

/// Fallback that classifies everything as `Other` and keeps the cause
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericFallback;

impl FaultFallback for GenericFallback {
    fn map_system_fault(&self, fault: &SystemFault, cause: FaultCause) -> RemoteException {
        RemoteException::new(
            RemoteExceptionKind::Other,
            format!("{}: {}", fault.kind, fault.message),
            cause,
        )
    }

    fn wrap_failure(&self, cause: FaultCause) -> RemoteException {
        let detail = cause.to_string();
        RemoteException::new(RemoteExceptionKind::Other, detail, cause)
    }
}

/// Exception translator
#[derive(Clone)]
pub struct ExceptionTranslator {
    fallback: Arc<dyn FaultFallback>,
}

impl ExceptionTranslator {
    /// Create a translator with the generic fallback
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(GenericFallback))
    }

    /// Create a translator with a caller-supplied fallback
    pub fn with_fallback(fallback: Arc<dyn FaultFallback>) -> Self {
        Self { fallback }
    }

    /// The fixed mapping table
    pub fn mapped_kind(kind: SystemFaultKind) -> Option<RemoteExceptionKind> {
        match kind {
            SystemFaultKind::TransactionRolledBack => Some(RemoteExceptionKind::TransactionRolledBack),
            SystemFaultKind::TransactionRequired => Some(RemoteExceptionKind::TransactionRequired),
            SystemFaultKind::InvalidTransaction => Some(RemoteExceptionKind::InvalidTransaction),
            SystemFaultKind::ObjectNotExist => Some(RemoteExceptionKind::ObjectNotExist),
            SystemFaultKind::NoPermission => Some(RemoteExceptionKind::NoPermission),
            SystemFaultKind::Marshal => Some(RemoteExceptionKind::Marshal),
            SystemFaultKind::Unknown => Some(RemoteExceptionKind::Unknown),
            _ => None,
        }
    }

    /// Translate a system fault
    pub fn translate(&self, fault: SystemFault) -> RemoteException {
        let cause: FaultCause = Arc::new(fault);
        self.translate_cause(cause)
    }

    /// Translate an opaque failure raised by the container dispatcher
    pub fn translate_dispatch_failure(&self, failure: DispatchError) -> RemoteException {
        self.translate_cause(Arc::from(failure))
    }

    /// Translate a bridge error into the caller-facing exception
    pub fn translate_error(&self, err: BridgeError) -> RemoteException {
        match err {
            BridgeError::Dispatch(failure) => self.translate_dispatch_failure(failure),
            BridgeError::ReferenceGeneration { .. } | BridgeError::LengthOverflow(_) => {
                error!("Reply marshaling failed: {}", err);
                RemoteException::reply_marshal(Arc::new(err))
            }
            // refused while decoding, so the operation never ran
            BridgeError::UnreachableTarget(_)
            | BridgeError::InvalidReference(_)
            | BridgeError::BufferUnderflow { .. } => {
                let detail = format!("cannot decode request: {}", err);
                RemoteException::new(RemoteExceptionKind::Marshal, detail, Arc::new(err))
            }
            BridgeError::ArgumentCoercion { .. }
            | BridgeError::ArgumentSlotCollision { .. }
            | BridgeError::ArgumentSlotOutOfRange { .. } => {
                let detail = format!("cannot demarshal arguments: {}", err);
                RemoteException::new(RemoteExceptionKind::Marshal, detail, Arc::new(err))
            }
            BridgeError::UnknownOperation(op) => self.translate(SystemFault::new(
                SystemFaultKind::BadOperation,
                format!("unknown operation: {}", op),
            )),
            other => self.guarded(|fallback| fallback.wrap_failure(Arc::new(other))),
        }
    }

    fn translate_cause(&self, cause: FaultCause) -> RemoteException {
        if let Some(ex) = cause.downcast_ref::<RemoteException>() {
            return ex.clone();
        }

        let Some(fault) = cause.downcast_ref::<SystemFault>().cloned() else {
            return self.guarded(|fallback| fallback.wrap_failure(cause));
        };

        match Self::mapped_kind(fault.kind) {
            Some(kind) => {
                debug!("Translated {} to {}", fault.kind, kind);
                RemoteException::new(kind, fault.message, cause)
            }
            None => self.guarded(|fallback| fallback.map_system_fault(&fault, cause)),
        }
    }

    /// Run the fallback, reporting a panic inside it as a reply marshal failure
    fn guarded<F>(&self, f: F) -> RemoteException
    where
        F: FnOnce(&dyn FaultFallback) -> RemoteException,
    {
        let fallback = self.fallback.as_ref();
        catch_unwind(AssertUnwindSafe(|| f(fallback))).unwrap_or_else(|_| {
            error!("Fault fallback panicked while classifying a failure");
            RemoteException::reply_marshal(Arc::new(SystemFault::reply_marshal()))
        })
    }
}

impl Default for ExceptionTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExceptionTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionTranslator").finish_non_exhaustive()
    }
}
