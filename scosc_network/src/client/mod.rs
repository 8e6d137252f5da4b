//! Outbound connections.

pub mod tcp;
