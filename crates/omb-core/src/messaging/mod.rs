//! Chat platform abstractions: the inbound update model and the transport port.

pub mod port;
pub mod throttled;
pub mod types;
