//! Value Decoder: raw OSC packets to decoded messages and bundles.
//!
//! Unlike the encoder this side faces the network, so every length is checked
//! against the input before it is used.

use alloc::{borrow::ToOwned, string::String, vec::Vec};

use crate::{
    ProtocolError, Value,
    message::{Bundle, Message, Packet, PacketKind},
    packet::BUNDLE_MARKER,
    scan::{MessageScanner, split_padded_str},
};

/// Bundles nested deeper than this are rejected instead of recursed into.
pub const MAX_BUNDLE_DEPTH: usize = 32;

#[inline]
fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decodes a single message.
///
/// A message made of only a command name has zero arguments. A message with arguments
/// but no type-tag string fails with [`ProtocolError::MissingTags`]; see
/// [`decode_message_lenient`] for the variant that still delivers the command.
pub fn decode_message(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let (name, width) = split_padded_str(bytes, 0)?;
    let command = lossy(name);
    let body = &bytes[width..];

    if body.is_empty() {
        return Ok(Message {
            command,
            args: Vec::new(),
        });
    }

    let args = {
        let mut scanner = MessageScanner::new(&command, body, width)?;

        if !scanner.has_tags() {
            return Err(ProtocolError::MissingTags {
                command: command.to_owned(),
            });
        }

        let mut args = Vec::with_capacity(scanner.tag_count());

        while let Some(tag) = scanner.next_tag()? {
            let value = match tag {
                b'i' => Value::Int(scanner.read_int32()?),
                b'f' => Value::Float(scanner.read_float32()?),
                b'd' => Value::Double(scanner.read_float64()?),
                b's' => Value::Symbol(lossy(scanner.read_string()?)),
                b'b' => Value::Blob(scanner.read_blob()?.to_vec()),
                _ => Value::Nil,
            };
            args.push(value);
        }

        args
    };

    Ok(Message { command, args })
}

/// Like [`decode_message`], but a missing type-tag string is logged and the command
/// is returned with zero arguments.
pub fn decode_message_lenient(bytes: &[u8]) -> Result<Message, ProtocolError> {
    match decode_message(bytes) {
        Err(ProtocolError::MissingTags { command }) => {
            log::warn!("OSC messages must have type tags: {command}");
            Ok(Message {
                command,
                args: Vec::new(),
            })
        }
        res => res,
    }
}

/// Decodes a bundle and, recursively, every element in it.
pub fn decode_bundle(bytes: &[u8]) -> Result<Bundle, ProtocolError> {
    decode_bundle_at_depth(bytes, 0)
}

/// Decodes either kind of packet, classifying it by its leading bytes.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    decode_packet_at_depth(bytes, 0)
}

fn decode_packet_at_depth(bytes: &[u8], depth: usize) -> Result<Packet, ProtocolError> {
    match PacketKind::classify(bytes) {
        PacketKind::Bundle => decode_bundle_at_depth(bytes, depth).map(Packet::Bundle),
        PacketKind::Message => decode_message_lenient(bytes).map(Packet::Message),
    }
}

fn decode_bundle_at_depth(bytes: &[u8], depth: usize) -> Result<Bundle, ProtocolError> {
    if depth >= MAX_BUNDLE_DEPTH {
        return Err(ProtocolError::NestingTooDeep(MAX_BUNDLE_DEPTH));
    }

    let (marker, rem) = bytes
        .split_first_chunk::<8>()
        .ok_or(ProtocolError::BadMarker)?;

    if *marker != BUNDLE_MARKER {
        return Err(ProtocolError::BadMarker);
    }

    let (&time_tag, mut rem) = rem.split_first_chunk::<8>().ok_or(ProtocolError::Truncated {
        offset: BUNDLE_MARKER.len(),
        needed: size_of::<u64>(),
        available: rem.len(),
    })?;

    let time_tag = u64::from_be_bytes(time_tag);
    let mut elements = Vec::new();

    while !rem.is_empty() {
        let offset = bytes.len() - rem.len();

        let truncated = |needed| ProtocolError::Truncated {
            offset,
            needed,
            available: rem.len(),
        };

        let (&size, tail) = rem.split_first_chunk::<4>().ok_or(truncated(4))?;

        let size = usize::try_from(i32::from_be_bytes(size)).map_err(|_| truncated(usize::MAX))?;

        let (element, tail) = tail
            .split_at_checked(size)
            .ok_or(truncated(size.saturating_add(4)))?;

        elements.push(decode_packet_at_depth(element, depth + 1)?);
        rem = tail;
    }

    Ok(Bundle { time_tag, elements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EncodeOptions, Encoder, time::IMMEDIATE};
    use alloc::vec;
    use pretty_assertions::assert_eq;

    fn sym(s: &str) -> Value {
        Value::symbol(s)
    }

    #[test]
    fn tagged_messages_round_trip() {
        let values = vec![
            sym("/s_new"),
            sym("default"),
            Value::Int(1000),
            Value::Int(0),
            Value::Int(0),
            Value::Float(0.25),
            Value::Blob(vec![1, 2, 3]),
        ];

        let bytes = Encoder::default().encode_message_tagged(&values).unwrap();
        let message = decode_message(&bytes).unwrap();

        assert_eq!(message.command, "/s_new");
        assert_eq!(message.into_value(), Value::Array(values));
    }

    #[test]
    fn float_width_follows_the_encoder_flag() {
        let values = [sym("/c_set"), Value::Int(0), Value::Double(0.1), Value::Float(0.25)];

        let doubles = Encoder::new(EncodeOptions {
            use_doubles: true,
            ..Default::default()
        });
        let bytes = doubles.encode_message_tagged(&values).unwrap();
        assert_eq!(&bytes[8..16], b",idd\0\0\0\0");

        // both numeric kinds come back as doubles
        assert_eq!(
            decode_message(&bytes).unwrap().args,
            vec![Value::Int(0), Value::Double(0.1), Value::Double(0.25)]
        );

        // and as floats, with precision lost, without the flag
        let bytes = Encoder::default().encode_message_tagged(&values).unwrap();
        assert_eq!(
            decode_message(&bytes).unwrap().args,
            vec![Value::Int(0), Value::Float(0.1), Value::Float(0.25)]
        );
    }

    #[test]
    fn bare_command_has_no_args() {
        assert_eq!(
            decode_message(b"/status\0").unwrap(),
            Message {
                command: "/status".into(),
                args: vec![],
            }
        );
    }

    #[test]
    fn tagless_arguments_are_reported_then_tolerated() {
        let mut bytes = b"/old\0\0\0\0".to_vec();
        bytes.extend(3i32.to_be_bytes());

        assert_eq!(
            decode_message(&bytes),
            Err(ProtocolError::MissingTags {
                command: "/old".into()
            })
        );
        assert_eq!(decode_message_lenient(&bytes).unwrap().args, vec![]);
    }

    #[test]
    fn unknown_tags_leave_an_empty_slot() {
        let mut bytes = b"/t\0\0,Ti\0".to_vec();
        bytes.extend(9i32.to_be_bytes());

        assert_eq!(
            decode_message(&bytes).unwrap().args,
            vec![Value::Nil, Value::Int(9)]
        );
    }

    #[test]
    fn truncated_blob_does_not_panic() {
        let mut bytes = b"/b\0\0,b\0\0".to_vec();
        bytes.extend(64i32.to_be_bytes());
        bytes.extend([0; 8]);

        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn unterminated_command_is_truncated() {
        assert!(matches!(
            decode_message(b"/abc"),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn bundles_decode_recursively() {
        let encoder = Encoder::default();
        let bytes = encoder
            .encode_bundle(
                &[
                    Value::Nil,
                    Value::Array(vec![sym("/n_free"), Value::Int(1000)]),
                    Value::Array(vec![
                        Value::Nil,
                        Value::Array(vec![sym("/g_new"), Value::Int(2)]),
                    ]),
                ],
                false,
            )
            .unwrap();

        assert_eq!(PacketKind::classify(&bytes), PacketKind::Bundle);

        let bundle = decode_bundle(&bytes).unwrap();
        assert_eq!(bundle.time_tag, IMMEDIATE);
        assert_eq!(bundle.elements.len(), 2);
        assert_eq!(
            bundle.elements[0],
            Packet::Message(Message {
                command: "/n_free".into(),
                args: vec![Value::Int(1000)],
            })
        );

        let Packet::Bundle(inner) = &bundle.elements[1] else {
            panic!("expected a nested bundle");
        };
        assert_eq!(inner.elements.len(), 1);
        assert_eq!(inner.elements[0].kind(), PacketKind::Message);
    }

    #[test]
    fn declared_sizes_match_element_lengths() {
        let encoder = Encoder::default();
        let bytes = encoder
            .encode_bundle(
                &[
                    Value::Double(12.5),
                    Value::Array(vec![sym("/a"), Value::string("xyz")]),
                    Value::Array(vec![sym("/bb"), Value::Blob(vec![0; 5])]),
                ],
                true,
            )
            .unwrap();

        let mut rem = &bytes[16..];
        let mut seen = 0;
        while let Some((&size, tail)) = rem.split_first_chunk::<4>() {
            let size = i32::from_be_bytes(size) as usize;
            assert!(decode_message(&tail[..size]).is_ok());
            rem = &tail[size..];
            seen += 1;
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn overlong_element_size_is_truncated() {
        let mut bytes = BUNDLE_MARKER.to_vec();
        bytes.extend(IMMEDIATE.to_be_bytes());
        bytes.extend(400i32.to_be_bytes());
        bytes.extend(b"/x\0\0");

        assert_eq!(
            decode_bundle(&bytes),
            Err(ProtocolError::Truncated {
                offset: 16,
                needed: 404,
                available: 8,
            })
        );
    }

    #[test]
    fn bundle_decoder_checks_the_marker() {
        assert_eq!(decode_bundle(b"#bundlX\0\0\0\0\0\0\0\0\x01"), Err(ProtocolError::BadMarker));
        assert_eq!(decode_bundle(b"#bun"), Err(ProtocolError::BadMarker));
    }

    #[test]
    fn runaway_nesting_is_rejected() {
        let mut bytes = Vec::new();
        for _ in 0..=MAX_BUNDLE_DEPTH {
            let mut outer = BUNDLE_MARKER.to_vec();
            outer.extend(IMMEDIATE.to_be_bytes());
            if !bytes.is_empty() {
                outer.extend((bytes.len() as i32).to_be_bytes());
                outer.extend(&bytes);
            }
            bytes = outer;
        }

        assert_eq!(
            decode_packet(&bytes),
            Err(ProtocolError::NestingTooDeep(MAX_BUNDLE_DEPTH))
        );
    }
}
