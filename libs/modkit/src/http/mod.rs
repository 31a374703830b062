//! Outbound HTTP helpers shared by modules.

pub mod client;
pub mod simple_otel;
