//! Value Encoder: runtime value sequences to OSC messages and bundles.

use alloc::vec::Vec;

use crate::{
    EncodeError, Value,
    packet::PacketBuilder,
    time::{self, TimeBase},
};

/// Process-wide encoding switches, passed explicitly instead of living in globals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncodeOptions {
    /// Write numeric fallback values as `d` (float64) instead of `f` (float32).
    pub use_doubles: bool,
    /// Anchor used when bundle times are given in elapsed seconds.
    pub time_base: TimeBase,
}

/// Turns value sequences into OSC packets.
///
/// In every entry point `values[0]` has a fixed meaning (the command, or the bundle time)
/// and the rest are arguments or bundle elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    options: EncodeOptions,
}

const INITIAL_CAPACITY: usize = 64;

impl Encoder {
    #[inline(always)]
    pub const fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    #[inline(always)]
    pub const fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Legacy "plain" message: the command followed by raw payloads, with no type tags.
    ///
    /// Values that have no untagged representation (nil, booleans, chars, empty arrays)
    /// are left out entirely.
    pub fn encode_message_untagged(&self, values: &[Value]) -> Result<Vec<u8>, EncodeError> {
        let mut packet = PacketBuilder::with_capacity(INITIAL_CAPACITY);
        let (command, args) = values.split_first().ok_or(EncodeError::Empty)?;

        packet.begin_message();
        append_command(&mut packet, command)?;
        for arg in args {
            self.append_untagged(&mut packet, arg)?;
        }
        packet.end_message()?;

        Ok(packet.into_bytes())
    }

    /// Type-tagged message: command, `,`-prefixed tag string, then one payload per tag.
    pub fn encode_message_tagged(&self, values: &[Value]) -> Result<Vec<u8>, EncodeError> {
        let mut packet = PacketBuilder::with_capacity(INITIAL_CAPACITY);
        self.write_message_tagged(&mut packet, values)?;
        Ok(packet.into_bytes())
    }

    /// Bundle: `values[0]` is the time, every other value an aggregate holding one element.
    ///
    /// A time that is not a number means "immediately". With `use_elapsed_time` the time is
    /// in elapsed seconds and goes through the [`TimeBase`]; otherwise it is taken as
    /// seconds on the OSC epoch.
    pub fn encode_bundle(
        &self,
        values: &[Value],
        use_elapsed_time: bool,
    ) -> Result<Vec<u8>, EncodeError> {
        let mut packet = PacketBuilder::with_capacity(INITIAL_CAPACITY);
        self.write_bundle(&mut packet, values, use_elapsed_time)?;
        Ok(packet.into_bytes())
    }

    /// The time tag a bundle starting with `time` would carry.
    pub fn bundle_time_tag(&self, time: &Value, use_elapsed_time: bool) -> u64 {
        let osc_time = match time.as_f64() {
            Some(t) if use_elapsed_time => self.options.time_base.elapsed_time_to_osc(t),
            Some(t) => time::seconds_to_osc(t),
            None => time::IMMEDIATE,
        };

        // OSC time 0 is never emitted: anything that far in the past is "now" anyway
        osc_time.max(time::IMMEDIATE)
    }

    fn write_message_tagged(
        &self,
        packet: &mut PacketBuilder,
        values: &[Value],
    ) -> Result<(), EncodeError> {
        let (command, args) = values.split_first().ok_or(EncodeError::Empty)?;

        packet.begin_message();
        append_command(packet, command)?;

        packet.reserve_tag_space(args.len() + 1);
        packet.append_type_tag(b',');

        for arg in args {
            self.append_tagged(packet, arg)?;
        }

        packet.end_message()
    }

    fn write_bundle(
        &self,
        packet: &mut PacketBuilder,
        values: &[Value],
        use_elapsed_time: bool,
    ) -> Result<(), EncodeError> {
        let (time, elements) = values.split_first().ok_or(EncodeError::Empty)?;

        packet.open_bundle(self.bundle_time_tag(time, use_elapsed_time));

        for (i, element) in elements.iter().enumerate() {
            match element {
                Value::Array(items) if Value::looks_like_bundle(items) => {
                    let nested = self.encode_bundle(items, use_elapsed_time)?;
                    packet.append_element(&nested)?;
                }
                Value::Array(items) => self.write_message_tagged(packet, items)?,
                other => {
                    return Err(EncodeError::NotAnAggregate {
                        index: i + 1,
                        kind: other.kind(),
                    });
                }
            }
        }

        packet.close_bundle();
        Ok(())
    }

    /// Encodes a non-empty aggregate argument as a full sub-packet.
    ///
    /// Nested bundles always count their time in elapsed seconds.
    fn encode_nested(&self, items: &[Value]) -> Result<Vec<u8>, EncodeError> {
        if Value::looks_like_bundle(items) {
            self.encode_bundle(items, true)
        } else {
            self.encode_message_tagged(items)
        }
    }

    #[inline]
    fn append_number(&self, packet: &mut PacketBuilder, v: f64) {
        if self.options.use_doubles {
            packet.append_float64(v);
        } else {
            packet.append_float32(v as f32);
        }
    }

    fn append_tagged(&self, packet: &mut PacketBuilder, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Int(i) => {
                packet.append_type_tag(b'i');
                packet.append_int32(*i);
            }
            Value::Symbol(s) | Value::String(s) => {
                packet.append_type_tag(b's');
                packet.append_padded_string(s.as_bytes());
            }
            Value::Blob(bytes) => {
                packet.append_type_tag(b'b');
                packet.append_blob(bytes)?;
            }
            Value::Array(items) if items.is_empty() => {
                // keeps one payload per tag
                packet.append_type_tag(b'i');
                packet.append_int32(0);
            }
            Value::Array(items) => {
                packet.append_type_tag(b'b');
                packet.append_blob(&self.encode_nested(items)?)?;
            }
            Value::Bool(b) => {
                packet.append_type_tag(b'i');
                packet.append_int32((*b).into());
            }
            Value::Nil | Value::Char(_) => {
                packet.append_type_tag(b'i');
                packet.append_int32(0);
            }
            Value::Float(f) => {
                packet.append_type_tag(self.float_tag());
                self.append_number(packet, (*f).into());
            }
            Value::Double(d) => {
                packet.append_type_tag(self.float_tag());
                self.append_number(packet, *d);
            }
        }

        Ok(())
    }

    fn append_untagged(
        &self,
        packet: &mut PacketBuilder,
        value: &Value,
    ) -> Result<(), EncodeError> {
        match value {
            Value::Int(i) => packet.append_int32(*i),
            Value::Symbol(s) | Value::String(s) => packet.append_padded_string(s.as_bytes()),
            Value::Blob(bytes) => packet.append_blob(bytes)?,
            Value::Array(items) if items.is_empty() => {}
            Value::Array(items) => packet.append_blob(&self.encode_nested(items)?)?,
            Value::Nil | Value::Bool(_) | Value::Char(_) => {}
            Value::Float(f) => self.append_number(packet, (*f).into()),
            Value::Double(d) => self.append_number(packet, *d),
        }

        Ok(())
    }

    #[inline(always)]
    fn float_tag(&self) -> u8 {
        if self.options.use_doubles { b'd' } else { b'f' }
    }
}

/// Commands are names, or integer command numbers.
fn append_command(packet: &mut PacketBuilder, command: &Value) -> Result<(), EncodeError> {
    match command {
        Value::Symbol(s) | Value::String(s) => packet.append_padded_string(s.as_bytes()),
        Value::Int(i) => packet.append_int32(*i),
        other => return Err(EncodeError::BadCommand(other.kind())),
    }
    Ok(())
}
