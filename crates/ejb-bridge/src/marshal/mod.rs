//! Parameter demarshaling
//!
//! Wire adapters hand over parameters in arrival order together with
//! whatever descriptor the protocol supplied; this module places them into
//! the argument array of the target method and coerces them to their
//! declared types.

mod arguments;
mod coerce;

pub use arguments::*;
pub use coerce::coerce;
