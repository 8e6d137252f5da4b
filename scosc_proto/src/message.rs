//! Decoded packet types.

use alloc::{string::String, vec::Vec};
use serde::{Deserialize, Serialize};

use crate::{Value, packet::BUNDLE_MARKER, time::TimeBase};

/// Whether a raw packet is a bundle or a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    Message,
    Bundle,
}

impl PacketKind {
    /// Classifies a packet by its first 8 bytes.
    #[inline(always)]
    pub fn classify(bytes: &[u8]) -> Self {
        if bytes.starts_with(&BUNDLE_MARKER) {
            Self::Bundle
        } else {
            Self::Message
        }
    }
}

/// A decoded message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    pub command: String,
    /// One value per type tag. Unknown tags leave a [`Value::Nil`] in their slot.
    pub args: Vec<Value>,
}

impl Message {
    /// The runtime form of a message: `[command_symbol, args...]`.
    pub fn into_value(self) -> Value {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(Value::Symbol(self.command));
        items.extend(self.args);
        Value::Array(items)
    }
}

/// A decoded bundle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bundle {
    pub time_tag: u64,
    pub elements: Vec<Packet>,
}

impl Bundle {
    /// The bundle's time on the runtime's elapsed clock.
    #[inline(always)]
    pub fn elapsed_time(&self, time_base: &TimeBase) -> f64 {
        time_base.osc_time_to_elapsed(self.time_tag)
    }

    /// Runtime forms of each element, in order.
    pub fn into_element_values(self, time_base: &TimeBase) -> Vec<Value> {
        self.elements
            .into_iter()
            .map(|e| e.into_value(time_base))
            .collect()
    }
}

/// Either kind of OSC packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Message(Message),
    Bundle(Bundle),
}

impl Packet {
    #[inline(always)]
    pub const fn kind(&self) -> PacketKind {
        match self {
            Packet::Message(_) => PacketKind::Message,
            Packet::Bundle(_) => PacketKind::Bundle,
        }
    }

    /// Messages become `[command, args...]`, bundles `[elapsed_time, elements...]`,
    /// mirroring the shape the encoder accepts.
    pub fn into_value(self, time_base: &TimeBase) -> Value {
        match self {
            Packet::Message(m) => m.into_value(),
            Packet::Bundle(b) => {
                let mut items = Vec::with_capacity(b.elements.len() + 1);
                items.push(Value::Double(b.elapsed_time(time_base)));
                items.extend(b.into_element_values(time_base));
                Value::Array(items)
            }
        }
    }
}
