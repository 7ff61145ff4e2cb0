//! Remote reference generation
//!
//! Local proxies never cross the wire. Before a reply is marshaled, every
//! proxy in the result is replaced by a reference built by the generator
//! registered for the proxy's container.

mod generator;
mod registry;

pub use generator::*;
pub use registry::*;
