//! Persistent TCP links to OSC servers.

use core::net::SocketAddrV4;
use std::{
    io::Write,
    net::{Shutdown, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use crate::{
    address::ReplyAddress,
    error::TransportError,
    framing::{FrameReader, write_framed},
    inbound::{Inbound, InboundPacket, InboundSender, TransportKind},
};

/// An open, length-prefixed TCP connection to a server.
///
/// A background thread reads framed replies and forwards them to the inbound
/// channel. When the peer closes the connection, the link marks itself closed and
/// queues an [`Inbound::ConnectionClosed`] event for the interpreter. Closing the
/// link from this side queues nothing.
#[derive(Debug)]
pub struct TcpLink {
    stream: TcpStream,
    peer: SocketAddrV4,
    open: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl TcpLink {
    /// Connects to `peer` with Nagle's algorithm disabled, and starts the reader thread.
    pub fn connect(
        peer: SocketAddrV4,
        inbound: InboundSender,
        max_frame: usize,
    ) -> Result<Self, TransportError> {
        let connect_err = |source| TransportError::ConnectFailed { addr: peer, source };

        let stream = TcpStream::connect(peer).map_err(connect_err)?;
        stream.set_nodelay(true).map_err(connect_err)?;

        let read_half = stream.try_clone().map_err(connect_err)?;
        let open = Arc::new(AtomicBool::new(true));
        let closing = Arc::new(AtomicBool::new(false));

        let reader = std::thread::Builder::new()
            .name(format!("osc-link-{peer}"))
            .spawn({
                let open = Arc::clone(&open);
                let closing = Arc::clone(&closing);
                move || read_replies(read_half, peer, inbound, max_frame, &open, &closing)
            })
            .map_err(connect_err)?;

        log::info!("Connected to {peer} over TCP");

        Ok(Self {
            stream,
            peer,
            open,
            closing,
            reader: Some(reader),
        })
    }

    #[inline(always)]
    pub fn peer(&self) -> SocketAddrV4 {
        self.peer
    }

    /// Returns `false` once either side has closed the connection.
    #[inline(always)]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Sends one packet with its length prefix.
    pub fn send_framed(&self, packet: &[u8]) -> Result<(), TransportError> {
        write_framed(&mut &self.stream, packet).map_err(|e| self.write_error(e))
    }

    /// Sends bytes as-is, without a length prefix.
    pub fn send_unframed(&self, bytes: &[u8]) -> Result<(), TransportError> {
        (&self.stream)
            .write_all(bytes)
            .map_err(|e| self.write_error(e))
    }

    fn write_error(&self, source: std::io::Error) -> TransportError {
        if crate::io_err_is_disconnect(source.kind()) {
            self.open.store(false, Ordering::Release);
            TransportError::Closed(self.peer)
        } else {
            TransportError::WriteFailed {
                addr: self.peer,
                source,
            }
        }
    }

    /// Shuts the connection down and waits for the reader thread to exit.
    pub fn close(mut self) {
        self.shutdown();

        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            log::error!("TCP reader for {} panicked", self.peer);
        }
    }

    fn shutdown(&self) {
        // set before the socket goes down, so the reader sees it on wakeup
        self.closing.store(true, Ordering::Release);
        self.open.store(false, Ordering::Release);
        // fails harmlessly if the peer already closed
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn read_replies(
    mut stream: TcpStream,
    peer: SocketAddrV4,
    inbound: InboundSender,
    max_frame: usize,
    open: &AtomicBool,
    closing: &AtomicBool,
) {
    let mut frames = FrameReader::new(max_frame);

    loop {
        match frames.poll(&mut stream) {
            Ok(Some(data)) => {
                let packet = InboundPacket {
                    data,
                    reply: ReplyAddress::from(peer),
                    transport: TransportKind::Tcp,
                };

                if inbound.send(Inbound::Packet(packet)).is_err() {
                    break;
                }
            }
            // blocking socket: only reached on spurious wakeups
            Ok(None) => continue,
            Err(e) if crate::io_err_is_disconnect(e.kind()) => {
                log::info!("TCP connection to {peer} closed");
                break;
            }
            Err(e) => {
                log::warn!("TCP connection to {peer} failed: {e}");
                break;
            }
        }
    }

    open.store(false, Ordering::Release);
    let _ = stream.shutdown(Shutdown::Both);

    if !closing.load(Ordering::Acquire) {
        let _ = inbound.send(Inbound::ConnectionClosed(peer));
    }
}
