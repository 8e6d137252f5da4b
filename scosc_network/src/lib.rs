//! Transport and dispatch layer for the OSC codec defined in the `scosc_proto` crate.
//!
//! This crate moves encoded OSC packets between the language runtime and synthesis
//! servers, and hands decoded inbound packets back to the interpreter.
//!
//! ## Scope
//!
//! - Sending packets over UDP, over persistent length-prefixed TCP links, or directly
//!   to an in-process synthesis engine.
//! - Background listeners (UDP, and optionally TCP) that never touch interpreter state:
//!   every inbound packet is pushed on a single channel and drained by a [`Dispatcher`]
//!   on the interpreter's thread.
//! - The entry points the runtime exposes to user code, gathered in [`OscContext`].
//!
//! Encoding rules, time tags and the value model live in `scosc_proto`. This crate only
//! decides where bytes go and who sees the replies.

pub mod address;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod framing;
pub mod inbound;
pub mod server;

pub use scosc_proto;
pub use scosc_utils;

pub use address::{Destination, ReplyAddress};
pub use config::{NetworkConfig, ServerOptions};
pub use context::OscContext;
pub use dispatch::{CallError, DispatchOutcome, Dispatcher, Interpreter};
pub use engine::{EngineLauncher, SynthEngine};
pub use error::{ConfigError, EngineError, Error, ResolveError, Result, TransportError};
pub use inbound::{Inbound, InboundPacket, ReplySink, TransportKind};

/// Returns `true` if the given I/O error kind represents a timeout condition.
///
/// This treats both `WouldBlock` and `TimedOut` as timeout-equivalent, since the
/// platform decides which one a socket read timeout reports.
#[inline(always)]
pub(crate) fn io_err_is_timeout(e: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind::*;
    [WouldBlock, TimedOut].contains(&e)
}

/// Returns `true` if the given I/O error kind means the peer went away.
#[inline(always)]
pub(crate) fn io_err_is_disconnect(e: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind::*;
    [
        UnexpectedEof,
        ConnectionReset,
        ConnectionAborted,
        BrokenPipe,
        NotConnected,
    ]
    .contains(&e)
}
