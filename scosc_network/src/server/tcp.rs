//! TCP listener accepting length-prefixed OSC streams.

use core::net::{SocketAddr, SocketAddrV4};
use std::{
    io,
    net::{TcpListener, TcpStream},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use rustc_hash::FxHashMap;

use crate::{framing::FrameReader, inbound::TransportKind};

use super::PacketHandler;

/// Accepts TCP connections and decodes their frames on one thread per connection.
#[derive(Debug)]
pub struct TcpPort {
    listener: TcpListener,
    recv_timeout: Duration,
    max_frame: usize,
}

impl TcpPort {
    pub fn bind(addr: SocketAddrV4, recv_timeout: Duration, max_frame: usize) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        // polled, so the accept loop can observe shutdown
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener,
            recv_timeout,
            max_frame,
        })
    }

    #[inline(always)]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until `running` is cleared, then waits for every
    /// connection thread to finish.
    pub fn listen<H>(&self, handler: &H, running: &AtomicBool) -> io::Result<()>
    where
        H: PacketHandler + Clone + Send,
    {
        std::thread::scope(|s| {
            let mut connections: FxHashMap<SocketAddrV4, std::thread::ScopedJoinHandle<'_, ()>> =
                FxHashMap::default();

            while running.load(Ordering::Relaxed) {
                let (stream, peer) = match self.listener.accept() {
                    Ok(r) => r,
                    Err(e) if crate::io_err_is_timeout(e.kind()) => {
                        std::thread::sleep(self.recv_timeout);
                        connections.retain(|_, c| !c.is_finished());
                        continue;
                    }
                    Err(e) if e.kind() == io::ErrorKind::ConnectionAborted => continue,
                    Err(e) => return Err(e),
                };

                let SocketAddr::V4(peer) = peer else {
                    log::debug!("Refusing TCP connection from IPv6 peer {peer}");
                    continue;
                };

                if let Err(e) = self.configure(&stream) {
                    log::warn!("Could not configure TCP connection from {peer}: {e}");
                    continue;
                }

                log::info!("Accepted TCP connection from {peer}");

                let mut handler = handler.clone();
                let max_frame = self.max_frame;

                let connection = s.spawn(move || {
                    serve_connection(stream, peer, &mut handler, max_frame, running);
                });

                connections.insert(peer, connection);
            }

            for (peer, connection) in connections.drain() {
                if connection.join().is_err() {
                    log::error!("TCP connection thread for {peer} panicked");
                }
            }

            Ok(())
        })
    }

    fn configure(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.recv_timeout))
    }
}

fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddrV4,
    handler: &mut impl PacketHandler,
    max_frame: usize,
    running: &AtomicBool,
) {
    let mut frames = FrameReader::new(max_frame);

    while running.load(Ordering::Relaxed) {
        match frames.poll(&mut stream) {
            Ok(Some(packet)) => {
                if handler.on_packet(peer, packet, TransportKind::Tcp).is_err() {
                    break;
                }
            }
            Ok(None) => continue,
            Err(e) if crate::io_err_is_disconnect(e.kind()) => {
                log::info!("TCP client {peer} disconnected");
                break;
            }
            Err(e) => {
                log::warn!("Dropping TCP client {peer}: {e}");
                break;
            }
        }
    }

    let _ = stream.shutdown(std::net::Shutdown::Both);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::write_framed;
    use core::net::Ipv4Addr;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<Box<[u8]>>>>);

    impl PacketHandler for Shared {
        fn on_packet(
            &mut self,
            _: SocketAddrV4,
            packet: Box<[u8]>,
            transport: TransportKind,
        ) -> io::Result<()> {
            assert_eq!(transport, TransportKind::Tcp);
            self.0.lock().unwrap().push(packet);
            Ok(())
        }
    }

    #[test]
    fn test_frames_reach_handler() {
        let port = TcpPort::bind(
            SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0),
            Duration::from_millis(10),
            1024,
        )
        .unwrap();
        let addr = port.local_addr().unwrap();

        let shared = Shared::default();
        let running = AtomicBool::new(true);

        std::thread::scope(|s| {
            let listener = s.spawn(|| port.listen(&shared, &running));

            let mut client = TcpStream::connect(addr).unwrap();
            write_framed(&mut client, b"/one\0\0\0\0").unwrap();
            write_framed(&mut client, b"/two\0\0\0\0").unwrap();

            for _ in 0..200 {
                if shared.0.lock().unwrap().len() == 2 {
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }

            running.store(false, Ordering::Relaxed);
            listener.join().unwrap().unwrap();
        });

        let received = shared.0.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(&*received[0], b"/one\0\0\0\0");
        assert_eq!(&*received[1], b"/two\0\0\0\0");
    }
}
