//! Length-prefixed framing for OSC over TCP.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes of packet.

use std::io::{self, Read, Write};

use arrayvec::ArrayVec;

/// Prefixes `packet` with its length and writes both in a single call.
pub fn write_framed<W: Write + ?Sized>(w: &mut W, packet: &[u8]) -> io::Result<()> {
    let len = u32::try_from(packet.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "packet too large to frame"))?;

    let mut frame = Vec::with_capacity(4 + packet.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(packet);

    w.write_all(&frame)
}

/// Incremental frame decoder.
///
/// Partial frames survive read timeouts: bytes read so far are kept until the next
/// call to [`poll`](FrameReader::poll), so the reader can periodically return control
/// to its caller without losing stream synchronization.
#[derive(Debug)]
pub struct FrameReader {
    header: ArrayVec<u8, 4>,
    body: Vec<u8>,
    filled: usize,
    max_frame: usize,
}

impl FrameReader {
    pub fn new(max_frame: usize) -> Self {
        Self {
            header: ArrayVec::new(),
            body: Vec::new(),
            filled: 0,
            max_frame,
        }
    }

    /// Reads until a whole frame is available.
    ///
    /// Returns `Ok(None)` if the underlying reader timed out first. End of stream is
    /// reported as [`io::ErrorKind::UnexpectedEof`], and an oversized length prefix as
    /// [`io::ErrorKind::InvalidData`]. Empty frames are skipped.
    pub fn poll<R: Read + ?Sized>(&mut self, r: &mut R) -> io::Result<Option<Box<[u8]>>> {
        loop {
            if !self.header.is_full() {
                let mut buf = [0; 4];
                let want = self.header.remaining_capacity();

                let n = match r.read(&mut buf[..want]) {
                    Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                    Ok(n) => n,
                    Err(e) if crate::io_err_is_timeout(e.kind()) => return Ok(None),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };

                self.header.extend(buf[..n].iter().copied());

                if let Ok(header) = self.header.as_slice().try_into() {
                    let len = u32::from_be_bytes(header) as usize;

                    if len > self.max_frame {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("frame of {len} bytes exceeds the {} byte limit", self.max_frame),
                        ));
                    }

                    self.body.resize(len, 0);
                    self.filled = 0;
                }

                continue;
            }

            if self.filled == self.body.len() {
                self.header.clear();

                if self.body.is_empty() {
                    continue;
                }

                return Ok(Some(core::mem::take(&mut self.body).into_boxed_slice()));
            }

            match r.read(&mut self.body[self.filled..]) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => self.filled += n,
                Err(e) if crate::io_err_is_timeout(e.kind()) => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
