//! Transaction demarcation tag

use std::fmt;
use std::str::FromStr;

use super::error::{BridgeError, Result};

/// Who owns the transaction boundary of an in-flight invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionDemarcation {
    /// The container opens and closes the transaction
    Container,
    /// The component manages its own transactions
    Bean,
}

impl TransactionDemarcation {
    /// Container-managed demarcation
    pub const CONTAINER: Self = TransactionDemarcation::Container;
    /// Bean-managed demarcation
    pub const BEAN: Self = TransactionDemarcation::Bean;

    pub fn is_container_managed(&self) -> bool {
        *self == Self::CONTAINER
    }

    pub fn is_bean_managed(&self) -> bool {
        *self == Self::BEAN
    }

    /// Parse a demarcation name (case-sensitive)
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "Container" => Ok(Self::CONTAINER),
            "Bean" => Ok(Self::BEAN),
            other => Err(BridgeError::InvalidDemarcationName(other.to_string())),
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionDemarcation::Container => "Container",
            TransactionDemarcation::Bean => "Bean",
        }
    }
}

impl fmt::Display for TransactionDemarcation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionDemarcation {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
