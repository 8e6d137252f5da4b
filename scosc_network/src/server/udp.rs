//! UDP transport: one socket, shared by the receive loop and the send path.

use core::net::{SocketAddr, SocketAddrV4};
use std::{
    io,
    net::UdpSocket,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crate::inbound::TransportKind;

use super::PacketHandler;

/// Largest datagram we accept.
pub const MAX_DATAGRAM: usize = 65536;

/// A bound UDP socket.
///
/// Sending and receiving both go through `&self`, so one port can be shared
/// between the listener thread and any number of senders.
#[derive(Debug)]
pub struct UdpPort {
    sock: UdpSocket,
}

impl UdpPort {
    /// Binds to `addr`. Receives time out after `recv_timeout` so the listener can
    /// notice shutdown requests.
    pub fn bind(addr: SocketAddrV4, recv_timeout: Duration) -> io::Result<Self> {
        let sock = UdpSocket::bind(addr)?;
        sock.set_read_timeout(Some(recv_timeout))?;
        Ok(Self { sock })
    }

    #[inline(always)]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    /// Sends `packet` as a single datagram.
    #[inline(always)]
    pub fn send_to(&self, packet: &[u8], dest: SocketAddrV4) -> io::Result<()> {
        let n = self.sock.send_to(packet, dest)?;

        (n == packet.len())
            .then_some(())
            .ok_or(io::ErrorKind::FileTooLarge.into())
    }

    #[inline(always)]
    fn recv<'a>(&self, buf: &'a mut [u8]) -> io::Result<(SocketAddr, &'a [u8])> {
        self.sock
            .recv_from(buf)
            .map(|(n, peer)| (peer, &buf[..n]))
    }

    /// Runs the receive loop until `running` is cleared.
    ///
    /// Every datagram from an IPv4 peer is copied out and handed to `handler`.
    /// Returns early if the handler or the socket fails.
    pub fn listen(
        &self,
        handler: &mut impl PacketHandler,
        running: &AtomicBool,
    ) -> io::Result<()> {
        let mut buf = vec![0; MAX_DATAGRAM].into_boxed_slice();

        while running.load(Ordering::Relaxed) {
            let (peer, packet) = match self.recv(&mut buf) {
                Ok(r) => r,
                Err(e) if crate::io_err_is_timeout(e.kind()) => continue,
                // ICMP port unreachable from an earlier send, on some platforms
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e),
            };

            let SocketAddr::V4(peer) = peer else {
                log::debug!("Ignoring datagram from IPv6 peer {peer}");
                continue;
            };

            if packet.is_empty() {
                continue;
            }

            handler.on_packet(peer, packet.into(), TransportKind::Udp)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::net::Ipv4Addr;
    use pretty_assertions::assert_eq;

    struct Collect(Vec<(SocketAddrV4, Box<[u8]>)>);

    impl PacketHandler for Collect {
        fn on_packet(
            &mut self,
            source: SocketAddrV4,
            packet: Box<[u8]>,
            transport: TransportKind,
        ) -> io::Result<()> {
            assert_eq!(transport, TransportKind::Udp);
            self.0.push((source, packet));
            // stop after the first packet
            Err(io::ErrorKind::Interrupted.into())
        }
    }

    #[test]
    fn test_listen_forwards_datagrams() {
        let loopback = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0);
        let port = UdpPort::bind(loopback, Duration::from_millis(20)).unwrap();
        let SocketAddr::V4(port_addr) = port.local_addr().unwrap() else {
            unreachable!()
        };

        let sender = UdpPort::bind(loopback, Duration::from_millis(20)).unwrap();
        let SocketAddr::V4(sender_addr) = sender.local_addr().unwrap() else {
            unreachable!()
        };
        sender.send_to(b"/status\0", port_addr).unwrap();

        let mut collect = Collect(Vec::new());
        let running = AtomicBool::new(true);
        let err = port.listen(&mut collect, &running).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert_eq!(collect.0, vec![(sender_addr, Box::<[u8]>::from(&b"/status\0"[..]))]);
    }

    #[test]
    fn test_listen_stops_when_cleared() {
        let port = UdpPort::bind(
            SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0),
            Duration::from_millis(10),
        )
        .unwrap();

        let running = AtomicBool::new(false);
        port.listen(&mut Collect(Vec::new()), &running).unwrap();
    }
}
