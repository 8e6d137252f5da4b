//! Codec error types.

use alloc::string::String;

/// Returned when a value sequence cannot be turned into an OSC packet.
///
/// Well-formed input never produces these; they flag a value of the wrong kind in a
/// position that has a fixed meaning (the command slot, or a bundle element slot).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The value sequence was empty, so there is no command name or time slot.
    #[error("cannot encode an empty value sequence")]
    Empty,
    /// The command slot held something that is neither a name nor an integer command.
    #[error("command must be a symbol, string or integer, got {0}")]
    BadCommand(&'static str),
    /// A bundle element was not an aggregate.
    #[error("bundle element {index} must be an array, got {kind}")]
    NotAnAggregate { index: usize, kind: &'static str },
    /// The encoded element or blob is larger than an int32 length prefix can describe.
    #[error("element of {0} bytes is too large for an OSC size prefix")]
    TooLarge(usize),
}

/// Malformed inbound bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A message carrying arguments has no `,`-prefixed type-tag string.
    ///
    /// Not fatal: the command is still known and is delivered with zero arguments.
    #[error("OSC messages must have type tags: {command}")]
    MissingTags { command: String },
    /// A field (string, blob, number or bundle element) runs past the end of the input.
    #[error("packet truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// The input was handed to the bundle decoder but does not start with `#bundle`.
    #[error("missing #bundle marker")]
    BadMarker,
    /// Bundles nested past the decoder's depth limit.
    #[error("bundles nested more than {0} levels deep")]
    NestingTooDeep(usize),
}

/// A value of the wrong kind was passed to an exposed entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("wrong argument type: expected {expected}, got {found}")]
pub struct ArgumentError {
    pub expected: &'static str,
    pub found: &'static str,
}
