//! Core bridge types
//!
//! This module contains the data structures shared by every layer:
//! - Identifiers: ContainerId, InterfaceType, ProxyRole, ProxyInfo
//! - Transaction demarcation
//! - Wire values and declared types
//! - System faults and remote exceptions
//! - Remote references

mod demarcation;
mod error;
mod fault;
mod identifiers;
pub(crate) mod objref;
mod value;

pub use demarcation::TransactionDemarcation;
pub use error::*;
pub use fault::*;
pub use identifiers::{
    ContainerId, InterfaceType, ProxyInfo, ProxyRole,
    generate_object_key,
};
pub use objref::*;
pub use value::*;
