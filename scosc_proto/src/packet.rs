//! Byte Packet Builder: an append-only, always 4-byte aligned OSC packet buffer.

use alloc::vec::Vec;

use crate::EncodeError;

/// The literal that opens every bundle, NUL included.
pub const BUNDLE_MARKER: [u8; 8] = *b"#bundle\0";

/// Width on the wire of an OSC string of `len` bytes: at least one NUL, padded to 4.
#[inline(always)]
pub const fn padded_str_len(len: usize) -> usize {
    (len + 4) & !3
}

/// Width on the wire of `len` bytes of blob content (length field excluded).
#[inline(always)]
pub const fn padded_blob_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Converts a byte count into an int32 size/length prefix.
#[inline]
pub(crate) fn size_prefix(len: usize) -> Result<[u8; 4], EncodeError> {
    i32::try_from(len)
        .map(i32::to_be_bytes)
        .map_err(|_| EncodeError::TooLarge(len))
}

/// Growable OSC packet buffer.
///
/// Every append keeps `len() % 4 == 0`, and multi-byte numbers are big-endian.
/// A fresh builder is made per encode; the transport consumes the bytes and drops it.
#[derive(Debug, Default, Clone)]
pub struct PacketBuilder {
    buf: Vec<u8>,
    // next tag slot, and the end of the reserved tag region (NUL terminator excluded)
    tag_cursor: usize,
    tag_end: usize,
    in_bundle: bool,
    // position of the size field of the bundle element currently being written
    element_size_pos: Option<usize>,
}

impl PacketBuilder {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    #[inline(always)]
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    #[inline(always)]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline(always)]
    pub fn append_int32(&mut self, v: i32) {
        self.buf.extend(v.to_be_bytes());
    }

    #[inline(always)]
    pub fn append_float32(&mut self, v: f32) {
        self.buf.extend(v.to_bits().to_be_bytes());
    }

    #[inline(always)]
    pub fn append_float64(&mut self, v: f64) {
        self.buf.extend(v.to_bits().to_be_bytes());
    }

    #[inline(always)]
    pub fn append_time_tag(&mut self, osc_time: u64) {
        self.buf.extend(osc_time.to_be_bytes());
    }

    /// Appends `bytes` followed by one to four NULs.
    pub fn append_padded_string(&mut self, bytes: &[u8]) {
        let width = padded_str_len(bytes.len());
        self.buf.extend_from_slice(bytes);
        self.buf.resize(self.buf.len() + width - bytes.len(), 0);
    }

    /// Appends an int32 length field, then `bytes` NUL-padded to 4.
    pub fn append_blob(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.buf.extend(size_prefix(bytes.len())?);
        let width = padded_blob_len(bytes.len());
        self.buf.extend_from_slice(bytes);
        self.buf.resize(self.buf.len() + width - bytes.len(), 0);
        Ok(())
    }

    /// Reserves a zeroed type-tag string able to hold `n_tags` characters
    /// (the leading `,` included) plus its terminator.
    ///
    /// The characters are filled in afterwards with [`append_type_tag`](Self::append_type_tag),
    /// while the arguments themselves are appended after the reserved region.
    pub fn reserve_tag_space(&mut self, n_tags: usize) {
        let start = self.buf.len();
        self.buf.resize(start + padded_str_len(n_tags), 0);
        self.tag_cursor = start;
        self.tag_end = start + n_tags;
    }

    /// Writes the next tag character into the reserved region.
    ///
    /// Tags beyond the reserved count are dropped so the terminator is never overwritten.
    pub fn append_type_tag(&mut self, tag: u8) {
        debug_assert!(self.tag_cursor < self.tag_end, "type tag space exhausted");
        if self.tag_cursor < self.tag_end {
            self.buf[self.tag_cursor] = tag;
            self.tag_cursor += 1;
        }
    }

    /// Writes the bundle marker and time tag. Messages begun until
    /// [`close_bundle`](Self::close_bundle) get a size prefix.
    pub fn open_bundle(&mut self, osc_time: u64) {
        self.in_bundle = true;
        self.buf.extend(BUNDLE_MARKER);
        self.append_time_tag(osc_time);
    }

    #[inline(always)]
    pub fn close_bundle(&mut self) {
        self.in_bundle = false;
    }

    /// Starts a message. Inside a bundle this writes a placeholder size field.
    pub fn begin_message(&mut self) {
        if self.in_bundle {
            self.element_size_pos = Some(self.buf.len());
            self.append_int32(0);
        }
    }

    /// Ends a message, back-patching its size field when inside a bundle.
    pub fn end_message(&mut self) -> Result<(), EncodeError> {
        if let Some(pos) = self.element_size_pos.take() {
            let size = self.buf.len() - pos - size_of::<i32>();
            self.buf[pos..pos + 4].copy_from_slice(&size_prefix(size)?);
        }
        Ok(())
    }

    /// Appends an already encoded packet as a size-prefixed bundle element.
    pub fn append_element(&mut self, packet: &[u8]) -> Result<(), EncodeError> {
        debug_assert_eq!(packet.len() % 4, 0);
        self.buf.extend(size_prefix(packet.len())?);
        self.buf.extend_from_slice(packet);
        Ok(())
    }
}
