//! Wire Scanner: a bounds-checked cursor over one message's tags and payloads.

use alloc::string::ToString;

use crate::{
    ProtocolError,
    packet::{padded_blob_len, padded_str_len},
};

/// Finds the end of a NUL-terminated OSC string at the start of `bytes`, returning the
/// string's bytes and its padded width.
pub(crate) fn split_padded_str(bytes: &[u8], offset: usize) -> Result<(&[u8], usize), ProtocolError> {
    let len = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or(ProtocolError::Truncated {
            offset,
            needed: bytes.len() + 1,
            available: bytes.len(),
        })?;

    let width = padded_str_len(len);

    if width > bytes.len() {
        return Err(ProtocolError::Truncated {
            offset,
            needed: width,
            available: bytes.len(),
        });
    }

    Ok((&bytes[..len], width))
}

/// Walks a message body in tag order.
///
/// Every read advances by the exact wire width of its field and fails with
/// [`ProtocolError::Truncated`] rather than reading past the end of the message.
#[derive(Debug, Clone)]
pub struct MessageScanner<'a> {
    command: &'a str,
    // tag characters, leading ',' excluded
    tags: Option<&'a [u8]>,
    next_tag: usize,
    payload: &'a [u8],
    pos: usize,
    // offset of `payload` within the message, for error reports
    payload_offset: usize,
}

impl<'a> MessageScanner<'a> {
    /// `body` is everything after the command name, `body_offset` its offset in the message.
    pub fn new(command: &'a str, body: &'a [u8], body_offset: usize) -> Result<Self, ProtocolError> {
        let (tags, payload_offset) = match body.split_first() {
            Some((b',', _)) => {
                let (tag_str, width) = split_padded_str(body, body_offset)?;
                (Some(&tag_str[1..]), width)
            }
            _ => (None, 0),
        };

        Ok(Self {
            command,
            tags,
            next_tag: 0,
            payload: &body[payload_offset..],
            pos: 0,
            payload_offset: body_offset + payload_offset,
        })
    }

    #[inline(always)]
    pub fn command(&self) -> &'a str {
        self.command
    }

    #[inline(always)]
    pub fn has_tags(&self) -> bool {
        self.tags.is_some()
    }

    /// Number of tags declared, zero when there is no tag string.
    #[inline(always)]
    pub fn tag_count(&self) -> usize {
        self.tags.map_or(0, <[u8]>::len)
    }

    /// Payload bytes not consumed yet.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.pos
    }

    /// Advances past one tag. `Ok(None)` once all tags are consumed.
    pub fn next_tag(&mut self) -> Result<Option<u8>, ProtocolError> {
        let tags = self.tags.ok_or_else(|| ProtocolError::MissingTags {
            command: self.command.to_string(),
        })?;

        let tag = tags.get(self.next_tag).copied();
        if tag.is_some() {
            self.next_tag += 1;
        }
        Ok(tag)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let rem = &self.payload[self.pos..];

        if n > rem.len() {
            return Err(ProtocolError::Truncated {
                offset: self.payload_offset + self.pos,
                needed: n,
                available: rem.len(),
            });
        }

        self.pos += n;
        Ok(&rem[..n])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let bytes = self.take(N)?;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    #[inline]
    pub fn read_int32(&mut self) -> Result<i32, ProtocolError> {
        self.take_array().map(i32::from_be_bytes)
    }

    #[inline]
    pub fn read_float32(&mut self) -> Result<f32, ProtocolError> {
        self.take_array().map(|b| f32::from_bits(u32::from_be_bytes(b)))
    }

    #[inline]
    pub fn read_float64(&mut self) -> Result<f64, ProtocolError> {
        self.take_array().map(|b| f64::from_bits(u64::from_be_bytes(b)))
    }

    /// Reads a padded string, returning its bytes without the terminator.
    pub fn read_string(&mut self) -> Result<&'a [u8], ProtocolError> {
        let rem = &self.payload[self.pos..];
        let (s, width) = split_padded_str(rem, self.payload_offset + self.pos)?;
        self.pos += width;
        Ok(s)
    }

    /// Peeks at the declared length of the blob under the cursor.
    pub fn read_blob_size(&self) -> Result<usize, ProtocolError> {
        let rem = &self.payload[self.pos..];
        let offset = self.payload_offset + self.pos;

        let (&len, _) = rem.split_first_chunk::<4>().ok_or(ProtocolError::Truncated {
            offset,
            needed: 4,
            available: rem.len(),
        })?;

        // a negative length can never fit
        usize::try_from(i32::from_be_bytes(len)).map_err(|_| ProtocolError::Truncated {
            offset,
            needed: usize::MAX,
            available: rem.len(),
        })
    }

    /// Reads a length-prefixed blob, returning its content without padding.
    pub fn read_blob(&mut self) -> Result<&'a [u8], ProtocolError> {
        let len = self.read_blob_size()?;
        let field = self.take(4 + padded_blob_len(len))?;

        Ok(&field[4..4 + len])
    }
}
