#![no_std]
//! Open Sound Control codec for a language runtime driving a synthesis server.
//!
//! This crate turns runtime values into OSC packets and back. It does no I/O;
//! sockets, dispatch and the shared process state live in `scosc_network`.
//!
//! ## Wire format
//!
//! - **Strings**: ASCII bytes, at least one NUL, padded with NULs to a multiple of 4.
//! - **Blobs**: a big-endian `int32` length, the bytes, NUL padding to a multiple of 4.
//! - **Messages**: command name, `,`-prefixed type-tag string, then one payload per tag
//!   (`i` int32, `f` float32, `d` float64, `s` string, `b` blob).
//! - **Bundles**: `#bundle\0`, a 64-bit fixed point time tag (`1` means "immediately"),
//!   then any number of `[int32 size][element]`, each element a message or a bundle.
//!
//! Every packet produced here is a multiple of 4 bytes long.
//!
//! ## Layout
//!
//! - [`packet`]: the append-only [`PacketBuilder`].
//! - [`encode`]: the [`Encoder`], value sequences to bytes.
//! - [`scan`]: the [`MessageScanner`], a bounds-checked cursor over one message.
//! - [`decode`]: bytes back to [`Message`]s, [`Bundle`]s and [`Packet`]s.
//! - [`time`]: OSC time tags and the elapsed-time [`TimeBase`](time::TimeBase).
//!
//! The types here implement `serde`'s `Serialize` and `Deserialize` so they can be
//! logged or stored through other `serde` backends.

extern crate alloc;

pub mod decode;
pub mod encode;
mod error;
pub mod message;
pub mod packet;
pub mod scan;
pub mod time;
mod value;

pub use decode::{decode_bundle, decode_message, decode_message_lenient, decode_packet};
pub use encode::{EncodeOptions, Encoder};
pub use error::{ArgumentError, EncodeError, ProtocolError};
pub use message::{Bundle, Message, Packet, PacketKind};
pub use packet::PacketBuilder;
pub use scan::MessageScanner;
pub use value::Value;
