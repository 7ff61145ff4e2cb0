//! Container dispatcher seam
//!
//! The dispatcher is the container side of the bridge: it owns instance
//! acquisition, the interceptor stack and transaction demarcation. The bridge
//! only hands it a bound invocation and waits for a value or a failure.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::invocation::Invocation;
use crate::types::{DispatchError, Value};

/// Container-side dispatcher
#[async_trait]
pub trait ContainerDispatcher: Send + Sync {
    /// Index of a method signature in the container's method table
    fn method_index_for(&self, signature: &str) -> Option<usize>;

    /// Run the invocation through the container
    ///
    /// The dispatcher may bind the instance context and attributes on the
    /// invocation and reads [`Invocation::demarcation`] to decide who owns
    /// the transaction. Recording the outcome is crate-private, so the
    /// returned value is always rewritten by the bridge before it reaches
    /// the wire.
    async fn dispatch(&self, invocation: &mut Invocation) -> Result<Value, DispatchError>;
}

/// Method table of a deployed component
#[derive(Clone, Debug, Default)]
pub struct MethodTable {
    signatures: Vec<String>,
    index: HashMap<String, usize>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from signatures in method-index order
    pub fn from_signatures<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for signature in signatures {
            table.push(signature);
        }
        table
    }

    /// Append a method, returning its index
    ///
    /// Re-adding a known signature returns the existing index.
    pub fn push(&mut self, signature: impl Into<String>) -> usize {
        let signature = signature.into();
        if let Some(&index) = self.index.get(&signature) {
            return index;
        }
        let index = self.signatures.len();
        self.index.insert(signature.clone(), index);
        self.signatures.push(signature);
        index
    }

    pub fn index_of(&self, signature: &str) -> Option<usize> {
        self.index.get(signature).copied()
    }

    pub fn signature(&self, index: usize) -> Option<&str> {
        self.signatures.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
